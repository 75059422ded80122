mod session;

pub use session::SessionContext;
