//! Mesh component: submesh ranges, bounding lifecycle, facet partitioning,
//! collisions, and ray picking.

pub mod facet;
pub mod mesh;
pub mod submesh;

pub use facet::{ClosestFacet, FacetData};
pub use mesh::{Mesh, MeshKind};
pub use submesh::{SubMesh, SubMeshHit};
