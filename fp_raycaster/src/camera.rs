use nalgebra::{vector, Point3, Vector2, Vector3};

use crate::common::{BoundBox, Ray, ViewportBox};

/// Ray-casting camera
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Position of the camera in world coordinates
    position: Point3<f32>,
    /// Up direction from the camera's perspective
    up: Vector3<f32>,
    /// Right direction from the camera's perspective
    right: Vector3<f32>,
    /// Direction of camera, unit length
    direction: Vector3<f32>,
    /// Aspect ratio of image plane
    aspect: f32,
    /// Vertical Field of View in degrees
    fov_y: f32,
    /// Size of image plane, calculated from fov_y
    img_plane_size: Vector2<f32>,
    /// Vector from camera point to pixel \[0,0\], upper left corner, in line with buffer convention
    dir_00: Vector3<f32>,
    /// Vector offset between two horizontally neighbouring pixels (such as: \[0,0\] -> \[1,0\])
    du: Vector3<f32>,
    /// Vector offset between two vertically neighbouring pixels (such as: \[0,0\] -> \[0,1\])
    dv: Vector3<f32>,
}

impl PerspectiveCamera {
    /// Construct new camera
    ///
    /// # Arguments
    ///
    /// * `position` - Position of the camera in world coordinates
    /// * `direction` - Looking direction of the camera
    ///
    /// # Notes
    ///
    /// The up direction is assumed to be the positive y axis, cameras looking along
    /// the y axis use the positive z axis instead.
    ///
    /// Default fov is 60 degrees, default aspect ratio is 1.
    pub fn new(position: Point3<f32>, direction: Vector3<f32>) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera {
            position,
            up: vector![0.0, 1.0, 0.0],
            right: vector![1.0, 0.0, 0.0],
            direction: direction.normalize(),
            aspect: 1.0,
            fov_y: 60.0,
            img_plane_size: vector![0.0, 0.0],
            dir_00: Vector3::zeros(),
            du: Vector3::zeros(),
            dv: Vector3::zeros(),
        };
        camera.recalc_plane_size();
        camera.recalc_plane();
        camera
    }

    /// Camera at `position` looking at `target`
    pub fn look_at(position: Point3<f32>, target: Point3<f32>) -> PerspectiveCamera {
        PerspectiveCamera::new(position, target - position)
    }

    /// Changes aspect ratio to match `(width, height)` resolution
    pub fn change_aspect_from_resolution(&mut self, width: usize, height: usize) {
        let aspect = (width as f32) / (height as f32);
        self.change_aspect(aspect);
    }

    /// Change vertical FoV of camera, in degrees
    ///
    /// Values outside of `(0;180)` are clamped.
    pub fn change_fov(&mut self, vertical_fov_deg: f32) {
        self.fov_y = vertical_fov_deg.clamp(1.0, 179.0);
        self.recalc_plane_size();
        self.recalc_dudv();
    }

    /// Change aspect ratio of camera
    ///
    /// For example 1.7777 for 16:9 ratio
    pub fn change_aspect(&mut self, aspect_ratio: f32) {
        self.aspect = aspect_ratio;
        self.recalc_plane_size();
        self.recalc_dudv();
    }

    /// Set new position of camera
    pub fn set_pos(&mut self, pos: Point3<f32>) {
        self.position = pos;
    }

    /// Set new direction of camera
    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        self.direction = direction.normalize();
        self.recalc_plane();
    }

    // Call when camera direction changed
    fn recalc_plane(&mut self) {
        let mut up = vector![0.0, 1.0, 0.0];
        if self.direction.cross(&up).norm_squared() < 1e-8 {
            up = vector![0.0, 0.0, 1.0];
        }
        self.right = self.direction.cross(&up).normalize();
        self.up = self.right.cross(&self.direction);
        self.recalc_dudv();
    }

    // Call when fov or aspect ratio changed
    fn recalc_plane_size(&mut self) {
        self.img_plane_size = vector![0.0, 2.0 * f32::tan(f32::to_radians(0.5 * self.fov_y))];
        self.img_plane_size.x = self.img_plane_size.y * self.aspect;
    }

    fn recalc_dudv(&mut self) {
        self.du = self.img_plane_size.x * self.right;
        self.dv = -self.img_plane_size.y * self.up; // Notice '-' sign, rows go downwards
        self.dir_00 = self.direction - 0.5 * self.du - 0.5 * self.dv;
    }

    /// Get ray originating in the camera position crossing view plane in coordinates `pixel_coord`
    ///
    /// # Arguments
    ///
    /// * pixel_coord - Coordinates in the range of `<0;1>x<0;1>`, point \[0,0\] being upper left corner
    pub fn get_ray(&self, pixel_coord: (f32, f32)) -> Ray {
        let dir = self.dir_00 + self.du * pixel_coord.0 + self.dv * pixel_coord.1;
        let dir = dir.normalize();
        Ray::new(self.position, dir)
    }

    /// Ray through the center of pixel `(x, y)` of an image with `resolution`
    pub fn pixel_ray(&self, x: f32, y: f32, resolution: (usize, usize)) -> Ray {
        let u = (x + 0.5) / resolution.0 as f32;
        let v = (y + 0.5) / resolution.1 as f32;
        self.get_ray((u, v))
    }

    /// Project bounding box of a volume to viewport
    ///
    /// Resulting viewport box is the minimal orthogonal rectangular projection.
    /// Returns `None` if any corner lies behind the camera plane, the projection is
    /// unbounded in that case.
    pub fn project_box(&self, bound_box: BoundBox) -> Option<ViewportBox> {
        // Source: https://github.com/ospray/ospray, Intel corp., Apache 2.0 license
        let mut viewbox = ViewportBox::new();

        let dun = self.du.normalize() / self.img_plane_size.x;
        let dvn = self.dv.normalize() / self.img_plane_size.y;

        for point in bound_box {
            let v = point - self.position;
            let den = v.dot(&self.direction);
            if den <= f32::EPSILON {
                return None;
            }
            // Intersection with the image plane at distance 1
            let screen_dir = v / den - self.dir_00;
            let x = screen_dir.dot(&dun);
            let y = screen_dir.dot(&dvn);
            viewbox.add_point(x, y);
        }

        Some(viewbox)
    }

    /// Direction getter
    pub fn get_dir(&self) -> Vector3<f32> {
        self.direction
    }

    /// Position getter
    pub fn get_pos(&self) -> Point3<f32> {
        self.position
    }
}

#[cfg(test)]
mod test {

    use nalgebra::point;

    use super::*;

    fn compare_float(actual: f32, expected: f32) {
        let err = f32::abs(actual - expected);
        assert!(err < 1e-5, "{actual} != {expected}");
    }

    #[test]
    fn camera_du_dv() {
        let cam_pos = point![0.0, 0.0, 0.0];
        let cam_target = point![1.0, 0.0, 0.0];
        let cam = PerspectiveCamera::look_at(cam_pos, cam_target);

        assert_eq!(cam.right, vector![0.0, 0.0, 1.0]);
        assert_eq!(cam.up, vector![0.0, 1.0, 0.0]);

        assert_eq!(cam.du.normalize(), vector![0.0, 0.0, 1.0]);
        assert_eq!(cam.dv.normalize(), vector![0.0, -1.0, 0.0]);

        assert_eq!(cam.du.z, cam.img_plane_size.x);
        assert_eq!(cam.dv.y, -cam.img_plane_size.y); // notice '-' sign, dv points down
    }

    #[test]
    fn looking_along_up_axis() {
        let cam = PerspectiveCamera::new(point![0.0, 10.0, 0.0], vector![0.0, -1.0, 0.0]);
        let ray = cam.get_ray((0.5, 0.5));

        assert!(cam.right.iter().all(|c| c.is_finite()));
        assert!((ray.direction - vector![0.0, -1.0, 0.0]).norm() < 1e-5);
    }

    #[test]
    fn center_pixel_ray() {
        let cam = PerspectiveCamera::look_at(point![-10.0, 0.0, 0.0], point![0.0, 0.0, 0.0]);
        let ray = cam.pixel_ray(1.0, 1.0, (3, 3));

        assert!((ray.direction - vector![1.0, 0.0, 0.0]).norm() < 1e-6);
    }

    #[test]
    fn project_origin() {
        let origin = point![0.0, 0.0, 0.0];

        let cam_pos = point![-10.0, 7.7, -9.6];
        let cam = PerspectiveCamera::look_at(cam_pos, origin);

        let projection = cam.project_box(BoundBox::new(origin, origin)).unwrap();

        compare_float(projection.lower.x, 0.5);
        compare_float(projection.lower.y, 0.5);

        compare_float(projection.upper.x, 0.5);
        compare_float(projection.upper.y, 0.5);
    }

    #[test]
    fn project_corner() {
        let cam_pos = point![-10.0, 0.0, 0.0];
        let cam = PerspectiveCamera::look_at(cam_pos, point![0.0, 0.0, 0.0]);

        // Viewing angle of 60deg, 30deg from the center
        let top = 10.0 * f32::sqrt(3.0) / 3.0;

        let point = point![0.0, top, top];

        let projection = cam.project_box(BoundBox::new(point, point)).unwrap();

        compare_float(projection.lower.x, 1.0);
        compare_float(projection.lower.y, 0.0);
    }

    #[test]
    fn box_behind_camera() {
        let cam = PerspectiveCamera::look_at(point![0.0, 0.0, 0.0], point![1.0, 0.0, 0.0]);
        let bbox = BoundBox::new(point![-2.0, -1.0, -1.0], point![2.0, 1.0, 1.0]);

        assert!(cam.project_box(bbox).is_none());
    }
}
