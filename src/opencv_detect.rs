//! Bridge to OpenCV's `features2d` detectors.
//!
//! Everything OpenCV-specific about feature extraction lives here: detector
//! construction, the `detect_and_compute` call and the conversions between
//! `image`/`ndarray` types on our side and `Mat`/`Vector<KeyPoint>` on
//! OpenCV's side.

use image::GrayImage;
use ndarray::Array2;
use nshare::AsNdarray2;
use opencv::{
    core::{no_array, Mat, Ptr, Vector},
    features2d::{AKAZE, ORB, SIFT},
    prelude::*,
};

use crate::{Descriptors, DetectorKind, KeyPoint, Result};

/// A constructed detector/descriptor instance. The variant is fixed when the
/// owning `FeatureMatcher` is built.
pub(crate) enum Provider {
    Sift(Ptr<SIFT>),
    Akaze(Ptr<AKAZE>),
    Orb(Ptr<ORB>),
}

impl Provider {
    pub(crate) fn create(kind: DetectorKind) -> Result<Self> {
        Ok(match kind {
            // OpenCV's stock SIFT parameters: unlimited features, 3 octave
            // layers, contrast/edge thresholds 0.04/10, sigma 1.6.
            DetectorKind::Sift => Provider::Sift(SIFT::create(0, 3, 0.04, 10., 1.6)?),
            DetectorKind::Akaze => Provider::Akaze(AKAZE::create_def()?),
            DetectorKind::Orb => Provider::Orb(ORB::create_def()?),
        })
    }

    /// Run detection and description on a grayscale image.
    ///
    /// An image without detectable features yields empty descriptors; the
    /// caller decides whether that is an error.
    pub(crate) fn detect_and_compute(
        &mut self,
        img: &GrayImage,
    ) -> Result<(Vec<KeyPoint>, Descriptors)> {
        let arr = img.as_ndarray2();
        let mat = Mat::new_rows_cols_with_data(
            arr.shape()[0] as i32,
            arr.shape()[1] as i32,
            arr.as_slice().expect("gray image buffer is contiguous"),
        )?;

        let mut cv_keypoints: Vector<opencv::core::KeyPoint> = Vector::new();
        let mut cv_descriptors = Mat::default();
        let binary = match self {
            Provider::Sift(d) => {
                d.detect_and_compute_def(&mat, &no_array(), &mut cv_keypoints, &mut cv_descriptors)?;
                false
            }
            Provider::Akaze(d) => {
                d.detect_and_compute_def(&mat, &no_array(), &mut cv_keypoints, &mut cv_descriptors)?;
                true
            }
            Provider::Orb(d) => {
                d.detect_and_compute_def(&mat, &no_array(), &mut cv_keypoints, &mut cv_descriptors)?;
                true
            }
        };

        let keypoints = cv_keypoints
            .iter()
            .map(|kp| KeyPoint {
                x: kp.pt().x,
                y: kp.pt().y,
                size: kp.size(),
                angle: kp.angle(),
                response: kp.response(),
            })
            .collect();
        let descriptors = if binary {
            Descriptors::Binary(mat_to_array::<u8>(&cv_descriptors)?)
        } else {
            Descriptors::Float(mat_to_array::<f32>(&cv_descriptors)?)
        };
        Ok((keypoints, descriptors))
    }
}

fn mat_to_array<T: opencv::core::DataType + Clone>(mat: &Mat) -> Result<Array2<T>> {
    if mat.empty() {
        return Ok(Array2::from_shape_vec((0, 0), Vec::new())
            .expect("empty shape matches empty buffer"));
    }
    let rows = mat.rows() as usize;
    let cols = mat.cols() as usize;
    let data = mat.data_typed::<T>()?.to_vec();
    Ok(Array2::from_shape_vec((rows, cols), data)
        .expect("descriptor buffer length matches rows * cols"))
}
