pub mod config;
pub mod events;
pub mod gesture;
pub mod inject;
pub mod keys;
pub mod router;
pub mod session;

pub mod platform {
    pub mod process;
}

pub mod tasks {
    pub mod button;
    pub mod control;
    pub mod library;
    pub mod supervisor;
}
