// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides the die mesh builder. The solid is the intersection
//! of a ball of the chosen outer radius with the N half-spaces delimited by
//! the planes tangent to each face center: a lat/long tessellation of the
//! sphere is clipped by every cutting plane, and each plane's cut outline is
//! then capped with a triangle fan to close the solid.

use std::f64::consts::PI;

use derive_builder::Builder;
use ordered_float::OrderedFloat;

use crate::{clip_polygon, Plane, PointSphere, Vec3};

/// The error raised when the outer radius cannot be derived from a
/// configuration's face centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    /// A face center coincides with the origin, or the two closest face
    /// centers define parallel (or coincident) cutting planes.
    #[error("the closest face pair defines parallel or coincident cutting planes")]
    DegeneratePlanes,
}

/// One oriented triangle of the output mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub normal: Vec3,
    pub vertices: [Vec3; 3],
}

/// The tessellation parameters of the sphere being clipped. The defaults
/// produce a smooth print-quality mesh; tests use much coarser grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct MeshConfig {
    /// Number of latitude bands (must be at least 1).
    #[builder(default = "100")]
    pub lat_divisions: usize,
    /// Number of longitude sectors (must be at least 1).
    #[builder(default = "100")]
    pub lon_divisions: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig { lat_divisions: 100, lon_divisions: 100 }
    }
}

/// The positions of all N faces of a configuration, scaled to the requested
/// face-to-center distance. This is the point list the mesh builder and
/// [`compute_max_radius`] consume: even indices are the stored points, odd
/// indices their antipodes.
pub fn face_centers(sphere: &PointSphere, face_distance: f64) -> Vec<Vec3> {
    (0..sphere.side_count()).map(|side| sphere.point(side) * face_distance).collect()
}

/// Builds the triangle mesh of the die: a sphere of radius `radius` clipped
/// by the tangent plane of every entry of `face_centers`, with each cut
/// capped. The output is deterministic for fixed inputs.
pub fn build_die_mesh(face_centers: &[Vec3], radius: f64, config: &MeshConfig) -> Vec<Triangle> {
    let lat = config.lat_divisions;
    let lon = config.lon_divisions;
    assert!(lat > 0 && lon > 0, "the tessellation needs at least one division");

    // tessellate the sphere on a (lat+1) x (lon+1) vertex grid
    let mut vertices = Vec::with_capacity((lat + 1) * (lon + 1));
    for i in 0..=lat {
        let theta = i as f64 * PI / lat as f64;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for j in 0..=lon {
            let phi = j as f64 * 2.0 * PI / lon as f64;
            let (sin_phi, cos_phi) = phi.sin_cos();
            vertices.push(Vec3::new(
                radius * sin_theta * cos_phi,
                radius * sin_theta * sin_phi,
                radius * cos_theta,
            ));
        }
    }

    let planes: Vec<Plane> = face_centers.iter().map(|&center| Plane::tangent_at(center)).collect();
    let mut boundaries: Vec<Vec<Vec3>> = vec![Vec::new(); planes.len()];
    let mut triangles = Vec::new();

    // clip every grid triangle by every plane, fanning out the survivors
    for i in 0..lat {
        for j in 0..lon {
            let first = i * (lon + 1) + j;
            let second = first + lon + 1;
            for corners in [[first, second, first + 1], [second, second + 1, first + 1]] {
                let mut polygon = vec![vertices[corners[0]], vertices[corners[1]], vertices[corners[2]]];
                for (p, plane) in planes.iter().enumerate() {
                    polygon = clip_polygon(&polygon, plane, &mut boundaries[p]);
                    if polygon.is_empty() {
                        break;
                    }
                }
                if polygon.len() < 3 {
                    continue;
                }
                for k in 1..polygon.len() - 1 {
                    let (v0, v1, v2) = (polygon[0], polygon[k], polygon[k + 1]);
                    let normal = (v1 - v0).cross(v2 - v0).normalize();
                    triangles.push(Triangle { normal, vertices: [v0, v1, v2] });
                }
            }
        }
    }

    // cap each plane's cut outline
    for (p, plane) in planes.iter().enumerate() {
        let outline = dedup_boundary(&boundaries[p]);
        if outline.is_empty() {
            continue;
        }
        cap_plane(plane, face_centers[p], &outline, &mut triangles);
    }

    triangles
}

/// Removes the duplicates a shared clipped edge produces, via the
/// approximate vector equality, preserving first-seen order.
fn dedup_boundary(boundary: &[Vec3]) -> Vec<Vec3> {
    let mut unique: Vec<Vec3> = Vec::new();
    for &point in boundary {
        if !unique.iter().any(|kept| kept.approx_eq(point)) {
            unique.push(point);
        }
    }
    unique
}

/// Closes one cut face: the outline points are sorted by angle around the
/// face center (in the plane's own 2D basis) and fanned from the center.
/// Wedges whose geometric normal opposes the plane normal get their first
/// two vertices swapped so every cap triangle faces outward.
fn cap_plane(plane: &Plane, center: Vec3, outline: &[Vec3], triangles: &mut Vec<Triangle>) {
    let normal = plane.normal;
    let u = if normal.x.abs() > 1e-6 || normal.y.abs() > 1e-6 {
        Vec3::new(-normal.y, normal.x, 0.0).normalize()
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };
    let v = normal.cross(u);

    let mut ordered: Vec<(f64, Vec3)> = outline
        .iter()
        .map(|&point| {
            let relative = point - center;
            (relative.dot(v).atan2(relative.dot(u)), point)
        })
        .collect();
    ordered.sort_by_key(|&(angle, _)| OrderedFloat(angle));

    let ring: Vec<Vec3> = ordered.into_iter().map(|(_, point)| point).collect();
    for i in 0..ring.len() {
        let mut v0 = ring[i];
        let mut v1 = ring[(i + 1) % ring.len()];
        let v2 = center;
        if (v1 - v0).cross(v2 - v0).dot(normal) < 0.0 {
            std::mem::swap(&mut v0, &mut v1);
        }
        triangles.push(Triangle { normal, vertices: [v0, v1, v2] });
    }
}

/// The largest outer radius that still lets every face keep a flat cap.
///
/// The two closest face centers are found by scanning all unordered pairs of
/// the reduced antipodal index set {0, 2, .., N-2} (one face per antipodal
/// pair suffices, by symmetry). Their tangent planes intersect in a line
/// whose distance to the origin, `|n1*d2 - n2*d1| / |n1 x n2|`, is the
/// radius at which the two caps meet.
pub fn compute_max_radius(face_centers: &[Vec3]) -> Result<f64, MeshError> {
    let mut closest: Option<(usize, usize)> = None;
    let mut min_dist = f64::INFINITY;
    for i in (0..face_centers.len()).step_by(2) {
        for j in ((i + 2)..face_centers.len()).step_by(2) {
            let dist = face_centers[i].distance_squared(face_centers[j]);
            if dist < min_dist {
                min_dist = dist;
                closest = Some((i, j));
            }
        }
    }
    let (i, j) = closest.ok_or(MeshError::DegeneratePlanes)?;

    let (p1, p2) = (face_centers[i], face_centers[j]);
    let (d1, d2) = (p1.length(), p2.length());
    if d1 == 0.0 || d2 == 0.0 {
        return Err(MeshError::DegeneratePlanes);
    }
    let (n1, n2) = (p1 / d1, p2 / d2);

    let numerator = (n1 * d2 - n2 * d1).length();
    let denominator = n1.cross(n2).length();
    if denominator < 1e-6 {
        return Err(MeshError::DegeneratePlanes);
    }
    Ok(numerator / denominator)
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_builder {
    use crate::{
        build_die_mesh, compute_max_radius, face_centers, MeshConfig, MeshConfigBuilder,
        MeshError, PointSphere, Vec3,
    };

    fn octahedron_centers(face_distance: f64) -> Vec<Vec3> {
        let points = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let sphere = PointSphere::from_points(6, points).unwrap();
        face_centers(&sphere, face_distance)
    }

    #[test]
    fn the_config_builder_defaults_to_a_hundred_divisions() {
        let config = MeshConfigBuilder::default().build().unwrap();
        assert_eq!(MeshConfig::default(), config);
        assert_eq!(100, config.lat_divisions);
        assert_eq!(100, config.lon_divisions);
    }

    #[test]
    fn an_unclipped_sphere_has_two_triangles_per_grid_cell() {
        let config = MeshConfigBuilder::default().lat_divisions(10usize).lon_divisions(12usize).build().unwrap();
        let mesh = build_die_mesh(&[], 1.0, &config);
        assert_eq!(10 * 12 * 2, mesh.len());
    }

    #[test]
    fn every_cut_face_of_an_octahedral_die_gets_a_cap() {
        let centers = octahedron_centers(0.8);
        let config = MeshConfigBuilder::default().lat_divisions(10usize).lon_divisions(10usize).build().unwrap();
        let mesh = build_die_mesh(&centers, 1.0, &config);

        // cap triangles carry the exact plane normal; for each of the six
        // cutting planes at least one wedge must have survived
        for center in &centers {
            let normal = center.normalize();
            let caps = mesh.iter().filter(|t| t.normal == normal).count();
            assert!(caps > 0, "no cap for face at {center}");
        }
    }

    #[test]
    fn a_two_sided_die_is_a_slab_with_two_caps() {
        let sphere = PointSphere::from_points(2, vec![Vec3::new(0.0, 0.0, 1.0)]).unwrap();
        let centers = face_centers(&sphere, 0.5);
        let config = MeshConfigBuilder::default().lat_divisions(10usize).lon_divisions(10usize).build().unwrap();
        let mesh = build_die_mesh(&centers, 1.0, &config);

        let up = Vec3::new(0.0, 0.0, 1.0);
        let down = Vec3::new(0.0, 0.0, -1.0);
        assert!(mesh.iter().any(|t| t.normal == up));
        assert!(mesh.iter().any(|t| t.normal == down));
        // no kept vertex pokes out of either cutting plane
        for triangle in &mesh {
            for vertex in &triangle.vertices {
                assert!(vertex.z <= 0.5 + 1e-9);
                assert!(vertex.z >= -0.5 - 1e-9);
            }
        }
    }

    #[test]
    fn meshing_is_deterministic() {
        let centers = octahedron_centers(0.7);
        let config = MeshConfigBuilder::default().lat_divisions(8usize).lon_divisions(8usize).build().unwrap();
        let first = build_die_mesh(&centers, 1.0, &config);
        let second = build_die_mesh(&centers, 1.0, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn the_max_radius_of_an_octahedron_matches_the_analytic_value() {
        // closest stored pair: two orthogonal unit directions at distance f
        // from the origin; their tangent planes meet on a line at distance
        // f * sqrt(2) from the origin
        let centers = octahedron_centers(0.8);
        let radius = compute_max_radius(&centers).unwrap();
        assert!((radius - 0.8 * 2.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn antipodal_only_configurations_are_degenerate() {
        // a D2 has a single stored direction: its two cutting planes are
        // parallel and bound no radius
        let sphere = PointSphere::from_points(2, vec![Vec3::new(0.0, 0.0, 1.0)]).unwrap();
        let centers = face_centers(&sphere, 0.5);
        assert_eq!(Err(MeshError::DegeneratePlanes), compute_max_radius(&centers));
    }

    #[test]
    fn a_face_center_at_the_origin_is_degenerate() {
        let centers = vec![Vec3::ZERO, Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0)];
        assert_eq!(Err(MeshError::DegeneratePlanes), compute_max_radius(&centers));
    }
}
