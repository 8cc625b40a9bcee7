//! Compare two images by extracting local features, matching them and
//! visualizing the result.
//!
//! The heavy lifting (scale spaces, corner/blob detection, descriptor
//! computation) is delegated to OpenCV's `features2d` module through the
//! [`opencv`] crate. What this crate adds on top is the thin pipeline around
//! it: a selectable detector family ([`DetectorKind`]), brute-force
//! descriptor matching with the metric and filtering policy appropriate to
//! each family, wall-clock instrumentation ([`timing::measure`]) and a
//! side-by-side match rendering ([`draw::draw_matches`]).
//!
//! ```no_run
//! use feature_match::{FeatureMatcher, DEFAULT_RATIO_THRESH};
//!
//! # fn run() -> Result<(), feature_match::Error> {
//! let img1 = image::open("img_1.jpg").unwrap();
//! let img2 = image::open("img_2.jpg").unwrap();
//! let mut matcher = FeatureMatcher::new("sift", DEFAULT_RATIO_THRESH)?;
//! let feats1 = matcher.extract("img_1.jpg", &img1)?;
//! let feats2 = matcher.extract("img_2.jpg", &img2)?;
//! let matches = matcher.match_descriptors(&feats1.descriptors, &feats2.descriptors)?;
//! println!("{} matches", matches.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use image::DynamicImage;
use ndarray::Array2;
use thiserror::Error as ThisError;

pub mod draw;
mod matching;
mod opencv_detect;
pub mod timing;

pub use matching::Match;
pub use timing::measure;

use opencv_detect::Provider;

/// Default Lowe ratio threshold for SIFT matching.
///
/// 0.6 is stricter than the conventional 0.75, deliberately trading recall
/// for precision.
pub const DEFAULT_RATIO_THRESH: f32 = 0.6;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("unsupported detector type: {0}. Supported types: SIFT, AKAZE, ORB")]
    UnsupportedDetector(String),
    #[error("invalid parameter(s): {0}")]
    InvalidParams(String),
    #[error("no features found in {image} using {detector}")]
    NoFeaturesFound {
        image: String,
        detector: DetectorKind,
    },
    #[error("cannot match: {0} descriptor set is empty")]
    EmptyDescriptors(&'static str),
    #[error("descriptor type does not match the {0} detector family")]
    DescriptorMismatch(DetectorKind),
    #[error("failed to load image {}", .0.display())]
    ImageLoad(PathBuf, #[source] image::ImageError),
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The three supported detector/descriptor families.
///
/// The family fixes the descriptor representation and with it the matching
/// policy: SIFT produces floating-point descriptors matched under Euclidean
/// distance with Lowe's ratio test, AKAZE and ORB produce binary descriptors
/// matched under Hamming distance and sorted by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    Sift,
    Akaze,
    Orb,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 3] = [DetectorKind::Sift, DetectorKind::Akaze, DetectorKind::Orb];

    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Sift => "SIFT",
            DetectorKind::Akaze => "AKAZE",
            DetectorKind::Orb => "ORB",
        }
    }

    /// Whether this family produces bit-packed binary descriptors.
    pub fn is_binary(self) -> bool {
        !matches!(self, DetectorKind::Sift)
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sift" => Ok(DetectorKind::Sift),
            "akaze" => Ok(DetectorKind::Akaze),
            "orb" => Ok(DetectorKind::Orb),
            _ => Err(Error::UnsupportedDetector(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub angle: f32,
    pub response: f32,
}

/// Descriptors for one image, one row per keypoint.
///
/// SIFT descriptors are 128-dimensional float vectors; AKAZE and ORB
/// descriptors are bit-packed into 61 and 32 bytes respectively.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    Float(Array2<f32>),
    Binary(Array2<u8>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match self {
            Descriptors::Float(a) => a.nrows(),
            Descriptors::Binary(a) => a.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturesResult {
    pub keypoints: Vec<KeyPoint>,
    /// One descriptor row per entry of `keypoints`, in the same order.
    pub descriptors: Descriptors,
}

/// Feature extraction and matching for one detector family.
///
/// The family is resolved once at construction; every later call dispatches
/// on the resulting variant rather than re-inspecting an identifier string.
pub struct FeatureMatcher {
    kind: DetectorKind,
    ratio_thresh: f32,
    provider: Provider,
}

impl FeatureMatcher {
    /// Build a matcher from a detector identifier (case-insensitive).
    ///
    /// `ratio_thresh` is Lowe's ratio threshold; it only affects SIFT
    /// matching but is validated for every family.
    pub fn new(detector_type: &str, ratio_thresh: f32) -> Result<Self> {
        Self::with_kind(detector_type.parse()?, ratio_thresh)
    }

    pub fn with_kind(kind: DetectorKind, ratio_thresh: f32) -> Result<Self> {
        if !ratio_thresh.is_finite() || ratio_thresh <= 0.0 {
            return Err(Error::InvalidParams(format!(
                "ratio_thresh must be a positive finite number, got {ratio_thresh}"
            )));
        }
        Ok(FeatureMatcher {
            kind,
            ratio_thresh,
            provider: Provider::create(kind)?,
        })
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn ratio_thresh(&self) -> f32 {
        self.ratio_thresh
    }

    /// Detect keypoints and compute descriptors for one image.
    ///
    /// The image is reduced to single-channel intensity internally; none of
    /// the supported detectors use color. `label` names the image in error
    /// messages. Finding no features at all is an error, never an empty
    /// success.
    pub fn extract(&mut self, label: &str, image: &DynamicImage) -> Result<FeaturesResult> {
        let gray = image.to_luma8();
        let (keypoints, descriptors) = self.provider.detect_and_compute(&gray)?;
        if descriptors.is_empty() {
            return Err(Error::NoFeaturesFound {
                image: label.to_string(),
                detector: self.kind,
            });
        }
        Ok(FeaturesResult {
            keypoints,
            descriptors,
        })
    }

    /// Match descriptors of image A against descriptors of image B.
    ///
    /// SIFT: 2-nearest-neighbor search under Euclidean distance, filtered by
    /// the ratio test; the result is ordered by query index and NOT sorted by
    /// distance. AKAZE/ORB: single nearest neighbor under Hamming distance
    /// for every query, unfiltered, sorted ascending by distance. The
    /// asymmetry matters when only the first few matches are inspected
    /// downstream.
    pub fn match_descriptors(&self, a: &Descriptors, b: &Descriptors) -> Result<Vec<Match>> {
        if a.is_empty() {
            return Err(Error::EmptyDescriptors("first"));
        }
        if b.is_empty() {
            return Err(Error::EmptyDescriptors("second"));
        }
        match (self.kind.is_binary(), a, b) {
            (false, Descriptors::Float(a), Descriptors::Float(b)) => Ok(
                matching::match_ratio_test(&a.view(), &b.view(), self.ratio_thresh),
            ),
            (true, Descriptors::Binary(a), Descriptors::Binary(b)) => {
                Ok(matching::match_hamming(&a.view(), &b.view()))
            }
            _ => Err(Error::DescriptorMismatch(self.kind)),
        }
    }
}
