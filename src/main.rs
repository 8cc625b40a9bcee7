//! Compare a fixed pair of images: extract features, match them, report the
//! count and elapsed time, then show the matches side by side.

use std::env;
use std::path::Path;

use log::info;

use feature_match::{
    draw, measure, Error, FeatureMatcher, FeaturesResult, Match, DEFAULT_RATIO_THRESH,
};

const IMAGE_DIR: &str = "processed_tci_images";
const IMAGE_NAMES: [&str; 2] = ["img_1.jpg", "img_2.jpg"];

fn main() -> Result<(), Error> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let dir = Path::new(IMAGE_DIR);
    let path1 = dir.join(IMAGE_NAMES[0]);
    let path2 = dir.join(IMAGE_NAMES[1]);
    let img1 = image::open(&path1).map_err(|e| Error::ImageLoad(path1.clone(), e))?;
    let img2 = image::open(&path2).map_err(|e| Error::ImageLoad(path2.clone(), e))?;

    let mut matcher = FeatureMatcher::new("sift", DEFAULT_RATIO_THRESH)?;
    info!("{} matcher performance:", matcher.kind());

    let (outcome, _elapsed) = measure("match_images", || -> Result<_, Error> {
        let feats1 = matcher.extract(IMAGE_NAMES[0], &img1)?;
        let feats2 = matcher.extract(IMAGE_NAMES[1], &img2)?;
        let matches = matcher.match_descriptors(&feats1.descriptors, &feats2.descriptors)?;
        Ok((feats1, feats2, matches))
    });
    let (feats1, feats2, matches): (FeaturesResult, FeaturesResult, Vec<Match>) = outcome?;
    info!("{}: {} matches found.", matcher.kind(), matches.len());

    let composite = draw::draw_matches(
        &img1.to_rgb8(),
        &feats1.keypoints,
        &img2.to_rgb8(),
        &feats2.keypoints,
        &matches,
    );
    let title = format!("Matches between two images ({} good matches)", matches.len());
    draw::show(&title, &composite)?;
    Ok(())
}
