use std::sync::Arc;

use crate::bounds::Bounds3f;
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::interaction::SurfaceInteraction;
use crate::light::{AreaLight, Light};
use crate::material::Material;
use crate::ray::Ray;
use crate::shape::{Shape, ShapeI};
use crate::spectrum::Spectrum;
use crate::vecmath::Point3f;

/// A shape/material pairing placed in the scene; an emission profile
/// turns the entity into an area light as well.
#[derive(Debug)]
pub struct Entity {
    shape: Arc<Shape>,
    material: Arc<Material>,
    light: Option<Arc<Light>>,
}

impl Entity {
    pub fn new(shape: Arc<Shape>, material: Arc<Material>, emission: Option<Spectrum>) -> Entity {
        let light = emission
            .filter(|e| !e.is_black())
            .map(|e| Arc::new(Light::Area(AreaLight::new(shape.clone(), e))));
        Entity {
            shape,
            material,
            light,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// The area light bound to this entity, if it emits.
    pub fn as_light(&self) -> Option<&Light> {
        self.light.as_deref()
    }
}

/// Ray hit paired with the entity that produced it.
pub struct SceneIntersection<'a> {
    pub inter: SurfaceInteraction,
    pub entity: &'a Entity,
}

/// Read-only aggregate of entities, lights and the camera. Built once
/// per render; every query below is const and safe to call from any
/// worker thread.
pub struct Scene {
    entities: Vec<Entity>,
    lights: Vec<Arc<Light>>,
    camera: Camera,
    world_bound: Bounds3f,
}

impl Scene {
    pub fn new(entities: Vec<Entity>, other_lights: Vec<Light>, camera: Camera) -> Result<Scene> {
        let mut world_bound = entities
            .iter()
            .fold(Bounds3f::empty(), |b, e| b.union(&e.shape.bounds()));
        if world_bound.is_empty() {
            world_bound = Bounds3f::new(
                Point3f::new(-1.0, -1.0, -1.0),
                Point3f::new(1.0, 1.0, 1.0),
            );
        } else {
            // Inflate slightly so boundary geometry stays strictly
            // inside.
            let d = 1e-3 * world_bound.diagonal();
            world_bound = Bounds3f::new(world_bound.low - d, world_bound.high + d);
        }

        let mut lights: Vec<Arc<Light>> = entities
            .iter()
            .filter_map(|e| e.light.clone())
            .collect();
        for mut light in other_lights {
            light.preprocess(&world_bound);
            lights.push(Arc::new(light));
        }
        if lights.is_empty() {
            return Err(Error::NoLight);
        }

        Ok(Scene {
            entities,
            lights,
            camera,
            world_bound,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn world_bound(&self) -> Bounds3f {
        self.world_bound
    }

    pub fn lights(&self) -> &[Arc<Light>] {
        &self.lights
    }

    pub fn environment_lights(&self) -> impl Iterator<Item = &Light> {
        self.lights
            .iter()
            .map(|l| l.as_ref())
            .filter(|l| l.as_environment().is_some())
    }

    pub fn has_intersection(&self, ray: &Ray) -> bool {
        self.entities.iter().any(|e| e.shape.intersect_p(ray))
    }

    pub fn closest_intersection(&self, ray: &Ray) -> Option<SceneIntersection<'_>> {
        let mut ray = *ray;
        let mut best: Option<SceneIntersection> = None;
        for entity in &self.entities {
            if let Some(inter) = entity.shape.intersect(&ray) {
                ray.t_max = inter.t;
                best = Some(SceneIntersection { inter, entity });
            }
        }
        best
    }

    /// Mutual visibility of two surface points; both ends are offset by
    /// the ray epsilon.
    pub fn visible(&self, a: Point3f, b: Point3f) -> bool {
        if a.distance_squared(&b) <= 0.0 {
            return false;
        }
        !self.has_intersection(&Ray::between(a, b))
    }

    /// Uniform light selection; the returned pdf is `1/light_count`.
    pub fn sample_light(&self, u: Float) -> (&Light, Float) {
        let n = self.lights.len();
        let idx = ((u * n as Float) as usize).min(n - 1);
        (&self.lights[idx], 1.0 / n as Float)
    }

    pub fn light_pdf(&self) -> Float {
        1.0 / self.lights.len() as Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paramset::ParamSet;
    use crate::shape::Sphere;
    use crate::vecmath::{Point2f, Vector3f};
    use float_cmp::assert_approx_eq;

    fn diffuse_material() -> Arc<Material> {
        Arc::new(
            Material::create(
                "diffuse",
                &ParamSet::new().set_spectrum("albedo", Spectrum::splat(0.5)),
            )
            .unwrap(),
        )
    }

    fn test_camera() -> Camera {
        Camera::create(
            "pinhole",
            &ParamSet::new()
                .set_vec3("pos", Vector3f::new(0.0, -5.0, 0.0))
                .set_vec3("dst", Vector3f::ZERO)
                .set_vec3("up", Vector3f::Z),
            1.0,
        )
        .unwrap()
    }

    fn sphere_entity(center: Point3f, radius: Float, emission: Option<Spectrum>) -> Entity {
        Entity::new(
            Arc::new(Shape::Sphere(Sphere::new(center, radius).unwrap())),
            diffuse_material(),
            emission,
        )
    }

    #[test]
    fn scene_without_lights_fails() {
        let entities = vec![sphere_entity(Point3f::ZERO, 1.0, None)];
        assert!(matches!(
            Scene::new(entities, Vec::new(), test_camera()),
            Err(Error::NoLight)
        ));
    }

    #[test]
    fn emissive_entity_registers_as_light() {
        let entities = vec![sphere_entity(
            Point3f::ZERO,
            1.0,
            Some(Spectrum::splat(4.0)),
        )];
        let scene = Scene::new(entities, Vec::new(), test_camera()).unwrap();
        assert_eq!(scene.lights().len(), 1);
        assert!(scene.entities[0].as_light().is_some());
        assert_approx_eq!(Float, scene.light_pdf(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn closest_intersection_picks_nearest_entity() {
        let entities = vec![
            sphere_entity(Point3f::new(0.0, 0.0, 0.0), 1.0, None),
            sphere_entity(Point3f::new(0.0, 3.0, 0.0), 1.0, Some(Spectrum::splat(1.0))),
        ];
        let scene = Scene::new(entities, Vec::new(), test_camera()).unwrap();
        let ray = Ray::new(Point3f::new(0.0, -5.0, 0.0), Vector3f::new(0.0, 1.0, 0.0));
        let hit = scene.closest_intersection(&ray).unwrap();
        assert_approx_eq!(Float, hit.inter.t, 4.0, epsilon = 1e-4);
        assert!(hit.entity.as_light().is_none());
    }

    #[test]
    fn visibility_is_blocked_by_occluders() {
        let entities = vec![
            sphere_entity(Point3f::ZERO, 1.0, None),
            sphere_entity(Point3f::new(0.0, 6.0, 0.0), 1.0, Some(Spectrum::splat(1.0))),
        ];
        let scene = Scene::new(entities, Vec::new(), test_camera()).unwrap();
        let a = Point3f::new(0.0, -3.0, 0.0);
        let b = Point3f::new(0.0, 3.0, 0.0);
        assert!(!scene.visible(a, b));
        let c = Point3f::new(0.0, -3.0, 5.0);
        let d = Point3f::new(0.0, 3.0, 5.0);
        assert!(scene.visible(c, d));
    }

    #[test]
    fn world_bound_contains_all_entities() {
        let entities = vec![
            sphere_entity(Point3f::new(-4.0, 0.0, 0.0), 1.0, None),
            sphere_entity(Point3f::new(9.0, 2.0, -3.0), 2.0, Some(Spectrum::splat(1.0))),
        ];
        let scene = Scene::new(entities, Vec::new(), test_camera()).unwrap();
        for e in &scene.entities {
            assert!(scene.world_bound().contains_bounds(&e.shape.bounds()));
        }
    }

    #[test]
    fn uniform_light_selection_covers_all_lights() {
        let entities = vec![
            sphere_entity(Point3f::ZERO, 1.0, Some(Spectrum::splat(1.0))),
            sphere_entity(Point3f::new(5.0, 0.0, 0.0), 1.0, Some(Spectrum::splat(2.0))),
        ];
        let scene = Scene::new(entities, Vec::new(), test_camera()).unwrap();
        let (_, pdf0) = scene.sample_light(0.1);
        let (_, pdf1) = scene.sample_light(0.9);
        assert_approx_eq!(Float, pdf0, 0.5, epsilon = 1e-6);
        assert_approx_eq!(Float, pdf1, 0.5, epsilon = 1e-6);
    }
}
