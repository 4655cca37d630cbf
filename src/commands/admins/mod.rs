pub mod clear;

use crate::{CommandResult, Context};
