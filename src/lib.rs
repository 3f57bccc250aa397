pub mod config;
pub mod error;
pub mod family;
pub mod graph;
pub mod query;
pub mod cache;
pub mod db;
pub mod http;

pub use config::Config;
pub use error::{KinshipError, Result};
pub use family::{FamilySnapshot, FamilyStore, Gender, NewPerson, Person, PersonId, PersonUpdate, Relation, RelationType};
pub use graph::{build_family_graph, FamilyGraph};
pub use query::{find_path, Algorithm, KinshipService, PathResult};
