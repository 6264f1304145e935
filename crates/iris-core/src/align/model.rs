/// Geometric mapping from camera 1 pixel coordinates to camera 2.
///
/// Camera 1 coordinates are scaled by `zoom` and rotated by `angle_deg`
/// around the rotation center `rc`, then shifted by (`dx`, `dy`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentModel {
    pub dx: f64,
    pub dy: f64,
    pub angle_deg: f64,
    pub rc: (f64, f64),
    pub zoom: (f64, f64),
}

impl AlignmentModel {
    /// Pure translation, rotation center at the origin.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            angle_deg: 0.0,
            rc: (0.0, 0.0),
            zoom: (1.0, 1.0),
        }
    }

    /// `[dx, dy, angle_deg]`, as stored in the reference file.
    pub fn coefficients(&self) -> [f64; 3] {
        [self.dx, self.dy, self.angle_deg]
    }

    /// Inverse of `coefficients`, with the auxiliary center and zoom.
    pub fn from_parts(coefficients: &[f64], rc: &[f64], zoom: &[f64]) -> Option<Self> {
        match (coefficients, rc, zoom) {
            ([dx, dy, angle_deg], [rcx, rcy], [zx, zy]) => Some(Self {
                dx: *dx,
                dy: *dy,
                angle_deg: *angle_deg,
                rc: (*rcx, *rcy),
                zoom: (*zx, *zy),
            }),
            _ => None,
        }
    }

    pub fn to_camera2(&self, x: f64, y: f64) -> (f64, f64) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let u = (x - self.rc.0) * self.zoom.0;
        let v = (y - self.rc.1) * self.zoom.1;
        (
            u * cos - v * sin + self.rc.0 + self.dx,
            u * sin + v * cos + self.rc.1 + self.dy,
        )
    }

    pub fn to_camera1(&self, x: f64, y: f64) -> (f64, f64) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let u = x - self.dx - self.rc.0;
        let v = y - self.dy - self.rc.1;
        (
            (u * cos + v * sin) / self.zoom.0 + self.rc.0,
            (-u * sin + v * cos) / self.zoom.1 + self.rc.1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turn_about_center() {
        let model = AlignmentModel {
            dx: 1.0,
            dy: -2.0,
            angle_deg: 90.0,
            rc: (10.0, 10.0),
            zoom: (1.0, 1.0),
        };
        let (x, y) = model.to_camera2(12.0, 10.0);
        assert!((x - 11.0).abs() < 1e-9, "x = {x}");
        assert!((y - 10.0).abs() < 1e-9, "y = {y}");
    }

    #[test]
    fn test_inverse() {
        let model = AlignmentModel {
            dx: 3.5,
            dy: -1.25,
            angle_deg: 1.7,
            rc: (64.0, 48.0),
            zoom: (1.02, 0.98),
        };
        let (x2, y2) = model.to_camera2(20.0, 75.0);
        let (x1, y1) = model.to_camera1(x2, y2);
        assert!((x1 - 20.0).abs() < 1e-9);
        assert!((y1 - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_parts_rejects_bad_shape() {
        assert!(AlignmentModel::from_parts(&[1.0, 2.0], &[0.0, 0.0], &[1.0, 1.0]).is_none());
        let m = AlignmentModel::from_parts(&[1.0, 2.0, 0.5], &[3.0, 4.0], &[1.0, 1.0]).unwrap();
        assert_eq!(m.coefficients(), [1.0, 2.0, 0.5]);
        assert_eq!(m.rc, (3.0, 4.0));
    }
}
