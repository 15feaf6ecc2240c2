use crate::math::Vec3;

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            forward: Vec3::new(0.0, 0.0, -1.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            yaw,
            pitch,
            fov: std::f32::consts::PI / 3.0,
            near: 0.5,
            // Block grids span frame_width x frame_height world units, so the
            // far plane sits well beyond any orbit radius.
            far: 4000.0,
        };
        camera.update_vectors();
        camera
    }

    pub fn update_vectors(&mut self) {
        let forward = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();

        let world_up = Vec3::new(0.0, 1.0, 0.0);
        let right = forward.cross(world_up).normalize();
        let up = right.cross(forward).normalize();

        self.forward = forward;
        self.right = if right.length_squared() < 1e-6 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            right
        };
        self.up = up;
    }

    pub fn world_to_view(&self, point: Vec3) -> Vec3 {
        let rel = point - self.position;
        Vec3::new(rel.dot(self.right), rel.dot(self.up), rel.dot(self.forward))
    }

    pub fn focal_lengths(&self, width: usize, height: usize) -> (f32, f32) {
        let h = height.max(1) as f32;
        let w = width.max(1) as f32;
        let tan_half = (self.fov * 0.5).tan().max(1e-6);
        let fy = h / (2.0 * tan_half);
        let fx = fy * (w / h);
        (fx, fy)
    }
}

pub fn reset_view(camera: &mut Camera, home: Vec3, target: Vec3) {
    *camera = Camera::new(home, -std::f32::consts::FRAC_PI_2, 0.0);
    look_at_target(camera, target);
}

pub fn move_forward(camera: &mut Camera, distance: f32) {
    camera.position += camera.forward * distance;
}

pub fn move_right(camera: &mut Camera, distance: f32) {
    camera.position += camera.right * distance;
}

pub fn adjust_pitch(camera: &mut Camera, delta: f32) {
    camera.pitch = (camera.pitch + delta).clamp(-1.5, 1.5);
    camera.update_vectors();
}

pub fn adjust_yaw(camera: &mut Camera, delta: f32) {
    camera.yaw += delta;
    camera.update_vectors();
}

pub fn look_at_target(camera: &mut Camera, target: Vec3) {
    let to_target = (target - camera.position).normalize();
    if to_target.length_squared() < 1e-8 {
        return;
    }
    camera.yaw = to_target.z.atan2(to_target.x);
    camera.pitch = to_target.y.clamp(-1.0, 1.0).asin();
    camera.update_vectors();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_faces_the_target() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 10.0), 0.0, 0.0);
        look_at_target(&mut camera, Vec3::ZERO);
        let view = camera.world_to_view(Vec3::ZERO);
        assert!(view.x.abs() < 1e-4);
        assert!(view.y.abs() < 1e-4);
        assert!((view.z - 10.0).abs() < 1e-3);
    }

    #[test]
    fn view_depth_grows_along_forward() {
        let camera = Camera::new(Vec3::ZERO, -std::f32::consts::FRAC_PI_2, 0.0);
        let near = camera.world_to_view(camera.position + camera.forward * 1.0);
        let far = camera.world_to_view(camera.position + camera.forward * 5.0);
        assert!(far.z > near.z);
    }
}
