pub use crate::error::AugError;
pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use approx::assert_abs_diff_eq;
pub use futures::{
    future,
    stream::{self, Stream, StreamExt as _, TryStreamExt as _},
};
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use par_stream::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::Debug,
    future::Future,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};
pub use tch::{Device, IndexOp, Kind, Tensor};
pub use tch_tensor_like::TensorLike;

unzip_n::unzip_n!(pub 2);
