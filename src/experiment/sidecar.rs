use std::path::Path;

use anyhow::Context as _;

use crate::{
    foundation::core::Vec3,
    foundation::error::{NanoVolumeError, NanoVolumeResult},
};

/// Scene properties recorded next to saved frames, one `key,value[,value...]` line per field.
#[derive(Clone, Debug, PartialEq)]
pub struct SidecarRecord {
    /// Volume name (file stem of the asset path).
    pub name: String,
    pub sun_rotation: Vec3,
    pub camera_position: Vec3,
    pub camera_rotation: Vec3,
    pub density: f32,
    pub light_steps: u32,
    /// Noise control id.
    pub noise: i32,
    /// Spatial filter control id.
    pub spatial: i32,
    pub temporal: bool,
    /// RMSE against the ground-truth frame, `-1` when unavailable.
    pub rmse: f64,
}

fn fmt_vec3(v: Vec3) -> String {
    format!("{:.4},{:.4},{:.4}", v.x, v.y, v.z)
}

impl SidecarRecord {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: String| {
            out.push_str(key);
            out.push(',');
            out.push_str(&value);
            out.push('\n');
        };
        line("name", self.name.clone());
        line("srot", fmt_vec3(self.sun_rotation));
        line("cpos", fmt_vec3(self.camera_position));
        line("crot", fmt_vec3(self.camera_rotation));
        line("density", format!("{:.4}", self.density));
        line("steps", self.light_steps.to_string());
        line("noise", self.noise.to_string());
        line("spatial", self.spatial.to_string());
        line("temporal", u8::from(self.temporal).to_string());
        line("rmse", format!("{:.4}", self.rmse));
        out
    }

    pub fn parse(text: &str) -> NanoVolumeResult<Self> {
        let mut name = None;
        let mut sun_rotation = None;
        let mut camera_position = None;
        let mut camera_rotation = None;
        let mut density = None;
        let mut light_steps = None;
        let mut noise = None;
        let mut spatial = None;
        let mut temporal = None;
        let mut rmse = None;

        for (lineno, raw) in text.lines().enumerate() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (key, value) = raw.split_once(',').ok_or_else(|| {
                NanoVolumeError::serde(format!("sidecar line {}: expected 'key,value'", lineno + 1))
            })?;
            let bad = |what: &str| {
                NanoVolumeError::serde(format!(
                    "sidecar line {}: invalid {what} value '{value}'",
                    lineno + 1
                ))
            };
            match key {
                "name" => name = Some(value.to_string()),
                "srot" => sun_rotation = Some(parse_vec3(value).ok_or_else(|| bad(key))?),
                "cpos" => camera_position = Some(parse_vec3(value).ok_or_else(|| bad(key))?),
                "crot" => camera_rotation = Some(parse_vec3(value).ok_or_else(|| bad(key))?),
                "density" => density = Some(value.parse::<f32>().map_err(|_| bad(key))?),
                "steps" => light_steps = Some(value.parse::<u32>().map_err(|_| bad(key))?),
                "noise" => noise = Some(value.parse::<i32>().map_err(|_| bad(key))?),
                "spatial" => spatial = Some(value.parse::<i32>().map_err(|_| bad(key))?),
                "temporal" => {
                    temporal = Some(match value {
                        "0" => false,
                        "1" => true,
                        _ => return Err(bad(key)),
                    })
                }
                "rmse" => rmse = Some(value.parse::<f64>().map_err(|_| bad(key))?),
                other => {
                    return Err(NanoVolumeError::serde(format!(
                        "sidecar line {}: unknown key '{other}'",
                        lineno + 1
                    )));
                }
            }
        }

        fn required<T>(v: Option<T>, key: &str) -> NanoVolumeResult<T> {
            v.ok_or_else(|| NanoVolumeError::serde(format!("sidecar is missing '{key}'")))
        }
        Ok(Self {
            name: required(name, "name")?,
            sun_rotation: required(sun_rotation, "srot")?,
            camera_position: required(camera_position, "cpos")?,
            camera_rotation: required(camera_rotation, "crot")?,
            density: required(density, "density")?,
            light_steps: required(light_steps, "steps")?,
            noise: required(noise, "noise")?,
            spatial: required(spatial, "spatial")?,
            temporal: required(temporal, "temporal")?,
            rmse: required(rmse, "rmse")?,
        })
    }

    pub fn write(&self, path: &Path) -> NanoVolumeResult<()> {
        std::fs::write(path, self.to_text())
            .with_context(|| format!("write sidecar '{}'", path.display()))?;
        Ok(())
    }

    pub fn read(path: &Path) -> NanoVolumeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read sidecar '{}'", path.display()))?;
        Self::parse(&text)
    }
}

fn parse_vec3(s: &str) -> Option<Vec3> {
    let mut it = s.split(',').map(|p| p.trim().parse::<f32>());
    let v = Vec3::new(it.next()?.ok()?, it.next()?.ok()?, it.next()?.ok()?);
    it.next().is_none().then_some(v)
}

#[cfg(test)]
#[path = "../../tests/unit/experiment/sidecar.rs"]
mod tests;
