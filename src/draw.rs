//! Side-by-side rendering of matched keypoints.

use image::{GenericImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use opencv::{core::Mat, highgui, prelude::*};

use crate::{KeyPoint, Match, Result};

const LINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const POINT_COLOR: Rgb<u8> = Rgb([255, 64, 64]);
const POINT_RADIUS: i32 = 3;

/// Place the two images next to each other and connect each matched keypoint
/// pair with a line. Only matched keypoints are marked; unmatched ones are
/// left out of the drawing entirely.
///
/// The returned composite is `width1 + width2` wide and as tall as the taller
/// of the two inputs. Nothing is written to disk; saving the image is the
/// caller's choice.
pub fn draw_matches(
    img1: &RgbImage,
    keypoints1: &[KeyPoint],
    img2: &RgbImage,
    keypoints2: &[KeyPoint],
    matches: &[Match],
) -> RgbImage {
    let mut canvas = RgbImage::new(
        img1.width() + img2.width(),
        img1.height().max(img2.height()),
    );
    canvas
        .copy_from(img1, 0, 0)
        .expect("canvas is at least as large as the first image");
    canvas
        .copy_from(img2, img1.width(), 0)
        .expect("canvas is at least as large as the second image");

    let offset = img1.width() as f32;
    for m in matches {
        let p1 = &keypoints1[m.query_idx];
        let p2 = &keypoints2[m.train_idx];
        draw_hollow_circle_mut(
            &mut canvas,
            (p1.x as i32, p1.y as i32),
            POINT_RADIUS,
            POINT_COLOR,
        );
        draw_hollow_circle_mut(
            &mut canvas,
            ((p2.x + offset) as i32, p2.y as i32),
            POINT_RADIUS,
            POINT_COLOR,
        );
        draw_line_segment_mut(
            &mut canvas,
            (p1.x, p1.y),
            (p2.x + offset, p2.y),
            LINE_COLOR,
        );
    }
    canvas
}

/// Display a composite in a window and block until a key is pressed.
///
/// The window title doubles as the caption, so callers put the match count
/// there.
pub fn show(title: &str, img: &RgbImage) -> Result<()> {
    // highgui expects BGR byte order.
    let bgr: Vec<u8> = img.pixels().flat_map(|p| [p.0[2], p.0[1], p.0[0]]).collect();
    let flat = Mat::from_slice(&bgr)?;
    let mat = flat.reshape(3, img.height() as i32)?;
    highgui::named_window(title, highgui::WINDOW_KEEPRATIO)?;
    highgui::imshow(title, &mat)?;
    highgui::wait_key(0)?;
    Ok(())
}
