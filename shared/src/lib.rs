pub mod animation;
pub mod camera;
pub mod codec;
pub mod collision;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod placement;
pub mod presence;
pub mod session;
pub mod streaming;
pub mod subscriptions;
pub mod throttle;
pub mod types;
pub mod vertical;
pub mod visibility;

pub use codec::{format_vec3, parse_vec3};
pub use collision::{CollisionWorld, RapierCollisionWorld, WorldStaticDef};
pub use config::ControllerConfig;
pub use error::{ContentError, ParseVec3Error, StoreError};
pub use pipeline::{FrameContext, FrameReport, SceneController, SceneSetup, frame_scale};
pub use throttle::Throttle;
pub use types::{
    CameraKind, CharacterState, DeviceClass, MapEdge, MapLimits, PlayerProfile, Vec3, WorldMode,
};
