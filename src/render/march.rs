//! Reference ray march over a density lattice.
//!
//! The volume buffer's words are read as an `n^3` lattice (`n = floor(cbrt(len))`), each word's
//! low byte giving a density in `[0, 1]`. The lattice is stretched over the cube
//! `[-half_extent, half_extent]^3` and sampled nearest-neighbour. Radiance is single-scattered
//! sunlight with Beer-Lambert attenuation on both the view and the shadow ray.

use rayon::prelude::*;

use crate::{
    foundation::core::{Canvas, Vec3, forward_from_euler_deg},
    render::plan::MarchParams,
};

/// Density lattice view over a volume buffer's words.
#[derive(Clone, Copy, Debug)]
pub struct Lattice<'a> {
    words: &'a [u32],
    n: usize,
}

impl<'a> Lattice<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            n: lattice_edge(words.len()),
        }
    }

    pub fn edge(&self) -> usize {
        self.n
    }

    /// Density at a point in `[0, 1)^3` lattice space. Zero outside and for empty lattices.
    pub fn density_at(&self, u: Vec3) -> f32 {
        if self.n == 0 {
            return 0.0;
        }
        let idx = |v: f32| -> Option<usize> {
            if !(0.0..1.0).contains(&v) {
                return None;
            }
            Some(((v * self.n as f32) as usize).min(self.n - 1))
        };
        let (Some(i), Some(j), Some(k)) = (idx(u.x), idx(u.y), idx(u.z)) else {
            return 0.0;
        };
        let word = self.words[i + self.n * (j + self.n * k)];
        (word & 0xFF) as f32 / 255.0
    }
}

pub(crate) fn lattice_edge(len: usize) -> usize {
    let mut n = (len as f64).cbrt().floor() as usize;
    while n > 0 && n * n * n > len {
        n -= 1;
    }
    while (n + 1) * (n + 1) * (n + 1) <= len {
        n += 1;
    }
    n
}

/// Pinhole camera basis derived from the march parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Camera {
    pub(crate) origin: Vec3,
    pub(crate) forward: Vec3,
    pub(crate) right: Vec3,
    pub(crate) up: Vec3,
    pub(crate) tan_half_fov: f32,
}

impl Camera {
    pub(crate) fn new(params: &MarchParams) -> Self {
        let forward = forward_from_euler_deg(params.camera_rotation).normalize_or_zero();
        let mut right = Vec3::Y.cross(forward).normalize_or_zero();
        if right == Vec3::ZERO {
            right = Vec3::X;
        }
        let up = forward.cross(right).normalize_or_zero();
        Self {
            origin: params.camera_position,
            forward,
            right,
            up,
            tan_half_fov: (params.fov_y_deg.to_radians() * 0.5).tan(),
        }
    }

    fn ray_dir(&self, canvas: Canvas, x: u32, y: u32) -> Vec3 {
        let aspect = canvas.width as f32 / canvas.height as f32;
        let nx = (2.0 * (x as f32 + 0.5) / canvas.width as f32 - 1.0) * aspect * self.tan_half_fov;
        let ny = (1.0 - 2.0 * (y as f32 + 0.5) / canvas.height as f32) * self.tan_half_fov;
        (self.forward + self.right * nx + self.up * ny).normalize_or_zero()
    }
}

/// Slab test against the cube `[-h, h]^3`; returns the entry/exit distances.
fn intersect_cube(origin: Vec3, dir: Vec3, h: f32) -> Option<(f32, f32)> {
    let mut t0 = f32::NEG_INFINITY;
    let mut t1 = f32::INFINITY;
    for (o, d) in [(origin.x, dir.x), (origin.y, dir.y), (origin.z, dir.z)] {
        if d.abs() < 1e-8 {
            if o < -h || o > h {
                return None;
            }
            continue;
        }
        let a = (-h - o) / d;
        let b = (h - o) / d;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    (t1 > t0).then_some((t0, t1))
}

fn to_lattice_space(p: Vec3, h: f32) -> Vec3 {
    (p + Vec3::splat(h)) / (2.0 * h)
}

fn light_transmittance(lattice: &Lattice<'_>, p: Vec3, params: &MarchParams) -> f32 {
    if params.light_steps == 0 || params.light_ray_length <= 0.0 {
        return 1.0;
    }
    let to_light = -params.light_dir.normalize_or_zero();
    let dt = params.light_ray_length / params.light_steps as f32;
    let mut tau = 0.0;
    for i in 0..params.light_steps {
        let q = p + to_light * (dt * (i as f32 + 0.5));
        tau += lattice.density_at(to_lattice_space(q, params.half_extent)) * params.density * dt;
    }
    (-tau).exp()
}

/// March one view ray. `jitter` in `[0, 1)` offsets every step within its interval.
pub fn march_pixel(
    lattice: &Lattice<'_>,
    params: &MarchParams,
    canvas: Canvas,
    x: u32,
    y: u32,
    jitter: f32,
) -> [f32; 4] {
    let camera = Camera::new(params);
    march_ray(lattice, params, &camera, camera.ray_dir(canvas, x, y), jitter)
}

fn march_ray(
    lattice: &Lattice<'_>,
    params: &MarchParams,
    camera: &Camera,
    dir: Vec3,
    jitter: f32,
) -> [f32; 4] {
    let Some((enter, exit)) = intersect_cube(camera.origin, dir, params.half_extent) else {
        return [0.0; 4];
    };
    let t0 = enter.max(params.clip_min);
    let t1 = exit.min(params.clip_max);
    if t1 <= t0 || params.view_steps == 0 {
        return [0.0; 4];
    }

    let dt = (t1 - t0) / params.view_steps as f32;
    let jitter = jitter.clamp(0.0, 0.999_999);
    let mut transmittance = 1.0f32;
    let mut radiance = 0.0f32;
    for i in 0..params.view_steps {
        let t = t0 + dt * (i as f32 + jitter);
        let p = camera.origin + dir * t;
        let sigma = lattice.density_at(to_lattice_space(p, params.half_extent)) * params.density;
        if sigma <= 0.0 {
            continue;
        }
        let step_t = (-sigma * dt).exp();
        radiance += transmittance * (1.0 - step_t) * light_transmittance(lattice, p, params);
        transmittance *= step_t;
        if transmittance < 1e-4 {
            break;
        }
    }
    [radiance, radiance, radiance, 1.0 - transmittance]
}

/// March every pixel of `out`, with `jitter(x, y)` supplying the per-pixel offset.
pub fn march_image<F>(
    lattice: &Lattice<'_>,
    params: &MarchParams,
    canvas: Canvas,
    jitter: F,
    out: &mut [[f32; 4]],
) where
    F: Fn(u32, u32) -> f32 + Sync,
{
    let camera = Camera::new(params);
    out.par_chunks_mut(canvas.width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.iter_mut().enumerate() {
                let (x, y) = (x as u32, y as u32);
                let dir = camera.ray_dir(canvas, x, y);
                *px = march_ray(lattice, params, &camera, dir, jitter(x, y));
            }
        });
}

#[cfg(test)]
#[path = "../../tests/unit/render/march.rs"]
mod tests;
