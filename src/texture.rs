use std::sync::Arc;

use crate::error::{Error, Result};
use crate::float::Float;
use crate::paramset::ParamSet;
use crate::spectrum::Spectrum;
use crate::vecmath::Point2f;

pub trait SpectrumTextureI {
    fn evaluate(&self, uv: Point2f) -> Spectrum;
}

#[derive(Debug)]
pub enum SpectrumTexture {
    Constant(SpectrumConstantTexture),
    Checkerboard(CheckerboardTexture),
    Scale(SpectrumScaleTexture),
}

impl SpectrumTexture {
    pub fn constant(value: Spectrum) -> SpectrumTexture {
        SpectrumTexture::Constant(SpectrumConstantTexture { value })
    }

    pub fn create(name: &str, params: &ParamSet) -> Result<SpectrumTexture> {
        match name {
            "constant" => Ok(SpectrumTexture::constant(
                params.require_spectrum("value")?,
            )),
            "checkerboard" => Ok(SpectrumTexture::Checkerboard(CheckerboardTexture {
                on: params.get_spectrum("on", Spectrum::splat(1.0)),
                off: params.get_spectrum("off", Spectrum::BLACK),
                grid_count: params.get_float("grid_count", 8.0),
            })),
            _ => Err(Error::UnknownType {
                kind: "texture",
                name: name.to_string(),
            }),
        }
    }
}

impl SpectrumTextureI for SpectrumTexture {
    fn evaluate(&self, uv: Point2f) -> Spectrum {
        match self {
            SpectrumTexture::Constant(t) => t.evaluate(uv),
            SpectrumTexture::Checkerboard(t) => t.evaluate(uv),
            SpectrumTexture::Scale(t) => t.evaluate(uv),
        }
    }
}

#[derive(Debug)]
pub struct SpectrumConstantTexture {
    pub value: Spectrum,
}

impl SpectrumTextureI for SpectrumConstantTexture {
    fn evaluate(&self, _uv: Point2f) -> Spectrum {
        self.value
    }
}

#[derive(Debug)]
pub struct CheckerboardTexture {
    pub on: Spectrum,
    pub off: Spectrum,
    pub grid_count: Float,
}

impl SpectrumTextureI for CheckerboardTexture {
    fn evaluate(&self, uv: Point2f) -> Spectrum {
        let u = (uv.x * self.grid_count).floor() as i64;
        let v = (uv.y * self.grid_count).floor() as i64;
        if (u + v) % 2 == 0 {
            self.on
        } else {
            self.off
        }
    }
}

#[derive(Debug)]
pub struct SpectrumScaleTexture {
    pub inner: Arc<SpectrumTexture>,
    pub scale: Spectrum,
}

impl SpectrumTextureI for SpectrumScaleTexture {
    fn evaluate(&self, uv: Point2f) -> Spectrum {
        self.scale * self.inner.evaluate(uv)
    }
}

pub trait FloatTextureI {
    fn evaluate(&self, uv: Point2f) -> Float;
}

#[derive(Debug)]
pub enum FloatTexture {
    Constant(FloatConstantTexture),
}

impl FloatTexture {
    pub fn constant(value: Float) -> FloatTexture {
        FloatTexture::Constant(FloatConstantTexture { value })
    }

    pub fn create(name: &str, params: &ParamSet) -> Result<FloatTexture> {
        match name {
            "constant" => Ok(FloatTexture::constant(params.require_float("value")?)),
            _ => Err(Error::UnknownType {
                kind: "texture",
                name: name.to_string(),
            }),
        }
    }
}

impl FloatTextureI for FloatTexture {
    fn evaluate(&self, uv: Point2f) -> Float {
        match self {
            FloatTexture::Constant(t) => t.evaluate(uv),
        }
    }
}

#[derive(Debug)]
pub struct FloatConstantTexture {
    pub value: Float,
}

impl FloatTextureI for FloatConstantTexture {
    fn evaluate(&self, _uv: Point2f) -> Float {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates() {
        let t = CheckerboardTexture {
            on: Spectrum::splat(1.0),
            off: Spectrum::BLACK,
            grid_count: 2.0,
        };
        let a = t.evaluate(Point2f::new(0.1, 0.1));
        let b = t.evaluate(Point2f::new(0.6, 0.1));
        assert_ne!(a, b);
    }

    #[test]
    fn factory_rejects_unknown_name() {
        let err = SpectrumTexture::create("marble", &ParamSet::new()).unwrap_err();
        assert!(err.to_string().contains("marble"));
    }
}
