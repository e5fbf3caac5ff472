use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::float::Float;
use crate::spectrum::Spectrum;
use crate::vecmath::{Point3f, Vector3f};

/// Typed parameter bag handed over by the scene-description parser.
/// Factories pull their arguments from here; the parser itself lives
/// outside the core.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    values: HashMap<String, ParamValue>,
}

#[derive(Debug, Clone)]
pub enum ParamValue {
    Float(Float),
    Int(i64),
    Bool(bool),
    Str(String),
    Spectrum(Spectrum),
    Vec3(Vector3f),
}

impl ParamSet {
    pub fn new() -> ParamSet {
        ParamSet::default()
    }

    pub fn set_float(mut self, name: &str, v: Float) -> ParamSet {
        self.values.insert(name.to_string(), ParamValue::Float(v));
        self
    }

    pub fn set_int(mut self, name: &str, v: i64) -> ParamSet {
        self.values.insert(name.to_string(), ParamValue::Int(v));
        self
    }

    pub fn set_bool(mut self, name: &str, v: bool) -> ParamSet {
        self.values.insert(name.to_string(), ParamValue::Bool(v));
        self
    }

    pub fn set_str(mut self, name: &str, v: &str) -> ParamSet {
        self.values
            .insert(name.to_string(), ParamValue::Str(v.to_string()));
        self
    }

    pub fn set_spectrum(mut self, name: &str, v: Spectrum) -> ParamSet {
        self.values
            .insert(name.to_string(), ParamValue::Spectrum(v));
        self
    }

    pub fn set_vec3(mut self, name: &str, v: Vector3f) -> ParamSet {
        self.values.insert(name.to_string(), ParamValue::Vec3(v));
        self
    }

    pub fn get_float(&self, name: &str, default: Float) -> Float {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as Float,
            _ => default,
        }
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.values.get(name) {
            Some(ParamValue::Str(v)) => v,
            _ => default,
        }
    }

    pub fn get_spectrum(&self, name: &str, default: Spectrum) -> Spectrum {
        match self.values.get(name) {
            Some(ParamValue::Spectrum(v)) => *v,
            Some(ParamValue::Float(v)) => Spectrum::splat(*v),
            _ => default,
        }
    }

    pub fn get_vec3(&self, name: &str, default: Vector3f) -> Vector3f {
        match self.values.get(name) {
            Some(ParamValue::Vec3(v)) => *v,
            _ => default,
        }
    }

    pub fn get_point3(&self, name: &str, default: Point3f) -> Point3f {
        match self.values.get(name) {
            Some(ParamValue::Vec3(v)) => Point3f::from(*v),
            _ => default,
        }
    }

    pub fn require_float(&self, name: &str) -> Result<Float> {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as Float),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "float",
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }

    pub fn require_spectrum(&self, name: &str) -> Result<Spectrum> {
        match self.values.get(name) {
            Some(ParamValue::Spectrum(v)) => Ok(*v),
            Some(ParamValue::Float(v)) => Ok(Spectrum::splat(*v)),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "spectrum",
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(v)) => Ok(v),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "string",
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }

    pub fn require_vec3(&self, name: &str) -> Result<Vector3f> {
        match self.values.get(name) {
            Some(ParamValue::Vec3(v)) => Ok(*v),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "vec3",
            }),
            None => Err(Error::MissingParameter(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let p = ParamSet::new().set_float("radius", 2.0).set_int("spp", 16);
        assert_eq!(p.get_float("radius", 1.0), 2.0);
        assert_eq!(p.get_int("spp", 4), 16);
        assert_eq!(p.get_int("absent", 4), 4);
    }

    #[test]
    fn require_reports_missing() {
        let p = ParamSet::new();
        assert!(matches!(
            p.require_float("radius"),
            Err(Error::MissingParameter(_))
        ));
    }

    #[test]
    fn int_promotes_to_float() {
        let p = ParamSet::new().set_int("fov", 60);
        assert_eq!(p.get_float("fov", 0.0), 60.0);
    }
}
