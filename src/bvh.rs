use itertools::partition;

use crate::bounds::Bounds3f;
use crate::float::Float;
use crate::ray::Ray;
use crate::vecmath::{Point3f, Vector3f};

const LEAF_MAX_PRIMS: usize = 4;

/// Flattened binary BVH over a primitive list. The structure stores
/// only bounds and a primitive permutation; primitive tests are
/// supplied by the caller during traversal.
#[derive(Debug)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    prim_order: Vec<u32>,
}

/// Interior nodes mark `start` with `u32::MAX` and keep the right child
/// index in `end_or_right`; the left child always follows the node.
/// Leaves hold a `[start, end)` range into `prim_order`.
#[derive(Debug, Copy, Clone)]
struct BvhNode {
    bounds: Bounds3f,
    start: u32,
    end_or_right: u32,
    axis: u8,
}

const INTERIOR: u32 = u32::MAX;

impl BvhNode {
    fn is_leaf(&self) -> bool {
        self.start != INTERIOR
    }
}

struct PrimInfo {
    index: u32,
    bounds: Bounds3f,
    centroid: Point3f,
}

impl Bvh {
    pub fn build(prim_bounds: &[Bounds3f]) -> Bvh {
        let mut prims: Vec<PrimInfo> = prim_bounds
            .iter()
            .enumerate()
            .map(|(i, b)| PrimInfo {
                index: i as u32,
                bounds: *b,
                centroid: b.centroid(),
            })
            .collect();

        let mut nodes = Vec::with_capacity(2 * prims.len().max(1));
        if !prims.is_empty() {
            build_recursive(&mut prims, 0, &mut nodes);
        }
        let prim_order = prims.iter().map(|p| p.index).collect();
        Bvh { nodes, prim_order }
    }

    pub fn bounds(&self) -> Bounds3f {
        self.nodes
            .first()
            .map(|n| n.bounds)
            .unwrap_or_else(Bounds3f::empty)
    }

    /// Closest-hit traversal. `prim(i, t_max)` tests primitive `i`
    /// against the ray restricted to `[ray.t_min, t_max]` and returns
    /// the hit distance on success; the traversal shrinks `t_max` as
    /// hits are found and prunes nodes beyond it.
    pub fn intersect_closest<F>(&self, ray: &Ray, mut prim: F) -> bool
    where
        F: FnMut(u32, Float) -> Option<Float>,
    {
        if self.nodes.is_empty() {
            return false;
        }
        let d_recip = recip(&ray.d);
        let mut t_max = ray.t_max;
        let mut found = false;
        let mut stack = Vec::with_capacity(64);
        stack.push(0u32);
        while let Some(ni) = stack.pop() {
            let node = &self.nodes[ni as usize];
            if !node.bounds.has_intersection_with_recip(ray, &d_recip, t_max) {
                continue;
            }
            if node.is_leaf() {
                for i in node.start..node.end_or_right {
                    let pi = self.prim_order[i as usize];
                    if let Some(t) = prim(pi, t_max) {
                        t_max = t;
                        found = true;
                    }
                }
            } else {
                // Near child first: the child on the ray's entry side is
                // popped before its sibling.
                let left = ni + 1;
                let right = node.end_or_right;
                if ray.d.axis(node.axis as usize) < 0.0 {
                    stack.push(left);
                    stack.push(right);
                } else {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        found
    }

    /// Any-hit traversal; short-circuits on the first accepted
    /// primitive.
    pub fn intersect_any<F>(&self, ray: &Ray, mut prim: F) -> bool
    where
        F: FnMut(u32) -> bool,
    {
        if self.nodes.is_empty() {
            return false;
        }
        let d_recip = recip(&ray.d);
        let mut stack = Vec::with_capacity(64);
        stack.push(0u32);
        while let Some(ni) = stack.pop() {
            let node = &self.nodes[ni as usize];
            if !node
                .bounds
                .has_intersection_with_recip(ray, &d_recip, ray.t_max)
            {
                continue;
            }
            if node.is_leaf() {
                for i in node.start..node.end_or_right {
                    if prim(self.prim_order[i as usize]) {
                        return true;
                    }
                }
            } else {
                stack.push(node.end_or_right);
                stack.push(ni + 1);
            }
        }
        false
    }

    #[cfg(test)]
    fn leaf_ranges(&self) -> Vec<(Bounds3f, u32, u32)> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| (n.bounds, n.start, n.end_or_right))
            .collect()
    }
}

fn recip(d: &Vector3f) -> Vector3f {
    Vector3f::new(1.0 / d.x, 1.0 / d.y, 1.0 / d.z)
}

fn build_recursive(prims: &mut [PrimInfo], offset: u32, nodes: &mut Vec<BvhNode>) {
    let bounds = prims
        .iter()
        .fold(Bounds3f::empty(), |b, p| b.union(&p.bounds));

    if prims.len() <= LEAF_MAX_PRIMS {
        nodes.push(BvhNode {
            bounds,
            start: offset,
            end_or_right: offset + prims.len() as u32,
            axis: 0,
        });
        return;
    }

    let centroid_bounds = prims
        .iter()
        .fold(Bounds3f::empty(), |b, p| b.expand(&p.centroid));
    let axis = centroid_bounds.max_extent_axis();

    // All centroids coincident; splitting cannot help.
    if centroid_bounds.diagonal().axis(axis) <= 0.0 {
        nodes.push(BvhNode {
            bounds,
            start: offset,
            end_or_right: offset + prims.len() as u32,
            axis: 0,
        });
        return;
    }

    let mid_value = centroid_bounds.centroid().axis(axis);
    let mut split = partition(prims.iter_mut(), |p| p.centroid.axis(axis) < mid_value);
    if split == 0 || split == prims.len() {
        // Midpoint failed to separate; fall back to an equal-count
        // median split.
        split = prims.len() / 2;
        prims.select_nth_unstable_by(split, |a, b| {
            a.centroid
                .axis(axis)
                .partial_cmp(&b.centroid.axis(axis))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let node_index = nodes.len();
    nodes.push(BvhNode {
        bounds,
        start: INTERIOR,
        end_or_right: 0,
        axis: axis as u8,
    });
    build_recursive(&mut prims[..split], offset, nodes);
    let right = nodes.len() as u32;
    build_recursive(&mut prims[split..], offset + split as u32, nodes);
    nodes[node_index].end_or_right = right;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{IndependentSampler, SamplerI};

    fn random_boxes(n: usize, seed: u64) -> Vec<Bounds3f> {
        let mut s = IndependentSampler::new(seed);
        (0..n)
            .map(|_| {
                let [x, y, z] = s.get_3d();
                let c = Point3f::new(x * 20.0 - 10.0, y * 20.0 - 10.0, z * 20.0 - 10.0);
                let e = 0.05 + 0.4 * s.get_1d();
                Bounds3f::new(
                    c + Vector3f::new(-e, -e, -e),
                    c + Vector3f::new(e, e, e),
                )
            })
            .collect()
    }

    #[test]
    fn prim_order_is_a_permutation() {
        let boxes = random_boxes(500, 3);
        let bvh = Bvh::build(&boxes);
        let mut seen = vec![false; boxes.len()];
        for &i in &bvh.prim_order {
            assert!(!seen[i as usize]);
            seen[i as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn leaf_primitives_lie_within_leaf_bounds() {
        let boxes = random_boxes(500, 9);
        let bvh = Bvh::build(&boxes);
        for (bounds, start, end) in bvh.leaf_ranges() {
            for i in start..end {
                let pb = boxes[bvh.prim_order[i as usize] as usize];
                assert!(bounds.contains_bounds(&pb));
            }
        }
    }

    #[test]
    fn leaves_respect_size_threshold() {
        let boxes = random_boxes(2000, 21);
        let bvh = Bvh::build(&boxes);
        for (_, start, end) in bvh.leaf_ranges() {
            assert!(end - start <= LEAF_MAX_PRIMS as u32 + 1);
        }
    }

    #[test]
    fn empty_build_never_intersects() {
        let bvh = Bvh::build(&[]);
        let ray = Ray::new(Point3f::ZERO, Vector3f::Z);
        assert!(!bvh.intersect_any(&ray, |_| true));
    }
}
