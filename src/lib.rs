#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod settings;
pub mod canvas;
pub mod skeleton;
pub mod mesh;
pub mod skinning;
pub mod solver;
pub mod assets;
pub mod protocol;
pub mod interaction;
pub mod editor;
pub mod sync;

pub use errors::{PoseError, Result};
pub use settings::StudioSettings;
pub use canvas::{CanvasCalibration, CanvasPlacement, CanvasReference};
pub use skeleton::{Bone, BoneDefinition, JointTargets, ManualPose, PoseSnapshot, Skeleton};
pub use mesh::{RestMesh, VertexWeights};
pub use skinning::{PosedBone, PosedMesh, SkinningEngine};
pub use solver::{MorphTargetSolver, ShapeParameters, ShapeSolver, SolvedBody};
pub use assets::{AssetCache, HumanAssets};
pub use protocol::{LocalTransport, PoseClient, PoseRequest, PoseResponse, PoseService, PoseTransport, PosedFrame};
pub use interaction::{CameraState, OrbitControls, PointerButtons, ViewProjection};
pub use editor::{EditMode, EditorEvent, PoseEditor};
pub use sync::{BatchExport, PersistedState, SyncLayer};
