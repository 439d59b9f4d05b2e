//! The built-in operator library.

pub mod strings;
pub mod tensors;

use std::rc::Rc;

use crate::engine::semantics::Registry;

/// Registers every built-in operator.
///
/// `ite` is registered twice (integer and string variants); grammar
/// binding selects by the rule's argument types.
pub fn install(registry: &mut Registry) {
    registry.register(Rc::new(strings::ConcatOp));
    registry.register(Rc::new(strings::CharAtOp));
    registry.register(Rc::new(strings::SubstrOp));
    registry.register(Rc::new(strings::ReplaceOp));
    registry.register(Rc::new(strings::StrLenOp));
    registry.register(Rc::new(strings::StrToIntOp));
    registry.register(Rc::new(strings::IntToStrOp));
    registry.register(Rc::new(strings::IndexOfOp));
    registry.register(Rc::new(strings::PrefixOfOp));
    registry.register(Rc::new(strings::SuffixOfOp));
    registry.register(Rc::new(strings::ContainsOp));
    registry.register(Rc::new(strings::AddOp));
    registry.register(Rc::new(strings::SubOp));
    registry.register(Rc::new(strings::IntEqOp));
    registry.register(Rc::new(strings::IteStrOp));
    registry.register(Rc::new(strings::IteIntOp));

    registry.register(Rc::new(tensors::ReshapeOp));
    registry.register(Rc::new(tensors::PermuteOp));
    registry.register(Rc::new(tensors::TensorIdOp));
    registry.register(Rc::new(tensors::FliplrOp));
    registry.register(Rc::new(tensors::FlipudOp));
    registry.register(Rc::new(tensors::VecInitOp));
    registry.register(Rc::new(tensors::VecConsOp));
}
