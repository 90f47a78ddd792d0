//! Client action header backend
//!
//! One single-line `extern` prototype per call, daemon and client-side
//! alike, in declaration order.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::Model;
use crate::signature::{c_signature, SigFlavor};

pub fn generate_actions_h(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::LGPLv2plus);

    for call in &model.calls {
        out.push_str(&c_signature(call, SigFlavor::CExtern));
    }

    Ok(out)
}
