pub mod copy;
pub mod handbrake;
pub mod makemkv;

pub use copy::CopyStage;
pub use handbrake::HandbrakeStage;
pub use makemkv::MakeMkvStage;
