pub mod animation;
pub mod bones;
pub mod capsule;
pub mod character;
pub mod constants;
pub mod contact_sensor;
pub mod effects;
pub mod footsteps;
pub mod gait;
pub mod input;
pub mod interpolation;
pub mod locomotion;
pub mod particles;
pub mod physics;
pub mod session;
pub mod stepper;

pub use character::{CharacterController, CharacterFrame};
pub use input::InputState;
pub use physics::PhysicsWorld;
pub use session::{FrameReport, Session};
pub use stepper::FixedStepper;
