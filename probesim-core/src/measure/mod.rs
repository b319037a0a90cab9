mod drop;
mod normal;

pub use self::{
    drop::{DropProbability, DropProbabilityError, DropProbabilityParseError},
    normal::{NormalParams, ParamsError},
};
