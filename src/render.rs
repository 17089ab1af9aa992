/// Canvas fitting and PNG encoding of rendered surfaces.
pub mod compose;
/// Sequential, deadline-bounded frame production.
pub mod producer;
