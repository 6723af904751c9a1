use internet_object_core::{ErrorCode, ErrorInfo, Value};

use crate::memberdef::MemberDef;
use crate::processor::{ProcessContext, Source};
use crate::types::TypeDef;

/// `bool`. The tokenizer already restricts the surface forms to
/// `true`/`false`/`T`/`F`, so anything that is not a boolean value here
/// is a type mismatch.
pub(super) struct BoolType;

impl TypeDef for BoolType {
    fn option_keys(&self) -> &'static [&'static str] {
        &["default", "null", "optional"]
    }

    fn parse(
        &self,
        source: Source<'_>,
        _member: &MemberDef,
        _ctx: &ProcessContext<'_>,
    ) -> Result<Value, ErrorInfo> {
        match source.scalar() {
            Some(Value::Bool(flag)) => Ok(Value::Bool(*flag)),
            Some(other) => Err(ErrorInfo::new(
                ErrorCode::NotABool,
                format!("expected a bool, found {}", other.type_name()),
            )),
            None => Err(ErrorInfo::new(
                ErrorCode::NotABool,
                "expected a bool, found a container",
            )),
        }
    }
}
