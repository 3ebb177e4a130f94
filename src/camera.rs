// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Camera parameters supplied to the tracker on every frame.

use serde::{Deserialize, Serialize};

/// Field of view and resolution of the camera that produced the points.
///
/// Only the ratio between focal length and sensor width matters to the tracker,
/// see [`CameraInfo::focal_length`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Diagonal field of view, in degrees.
    pub fov: f64,
    /// Horizontal resolution, in pixels.
    pub res_x: u32,
    /// Vertical resolution, in pixels.
    pub res_y: u32,
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            fov: 56.0,
            res_x: 640,
            res_y: 480,
        }
    }
}

impl CameraInfo {
    /// Focal length divided by sensor width.
    pub fn focal_length(&self) -> f64 {
        focal_length(self.fov, self.res_x, self.res_y)
    }
}

/// Focal length divided by sensor width, for a diagonal field of view given in degrees.
///
/// Points are normalized by the image width, so the diagonal field of view
/// is first brought back to the horizontal axis with the aspect ratio.
pub fn focal_length(fov: f64, res_x: u32, res_y: u32) -> f64 {
    let (w, h) = (f64::from(res_x), f64::from(res_y));
    let aspect_x = w / (w * w + h * h).sqrt();
    aspect_x / (2.0 * (0.5 * fov.to_radians()).tan())
}

// Tests #######################################################################

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn focal_length_of_default_camera() {
        // 640x480 has a 800 pixels diagonal.
        let expected = 0.8 / (2.0 * 28_f64.to_radians().tan());
        assert_relative_eq!(CameraInfo::default().focal_length(), expected, epsilon = 1e-12);
    }

    #[test]
    fn wider_fov_means_shorter_focal() {
        let narrow = focal_length(40.0, 1280, 720);
        let wide = focal_length(90.0, 1280, 720);
        assert!(wide < narrow);
    }

    #[test]
    fn deserialize_from_json() {
        let info: CameraInfo =
            serde_json::from_str(r#"{ "fov": 75.0, "res_x": 1920, "res_y": 1080 }"#).unwrap();
        assert_eq!(info.res_x, 1920);
        assert_eq!(info.res_y, 1080);
        assert_relative_eq!(info.fov, 75.0);
    }
}
