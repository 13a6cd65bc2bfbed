mod hook;

pub use hook::HookCommands;
