//! Builtin symbols
//!
//! Well-known symbols are isolate-scoped, so they are tracked in the
//! internal context (`ctx_ref` 0).

use super::HostIsolate;
use crate::native::HandleScope;
use isobridge_sdk::{BridgeError, BridgeResult, CtxRef, SymbolIndex, ValueRef};

impl HostIsolate {
    /// The isolate's instance of a well-known symbol. Repeated calls yield
    /// distinct references to the identical symbol.
    pub fn builtin_symbol(&self, index: SymbolIndex) -> BridgeResult<ValueRef> {
        let scope = HandleScope::new(&self.isolate);
        let internal = self.shared.registry.resolve(&scope, CtxRef::INTERNAL)?;
        let symbol = scope.well_known_symbol(index);
        self.shared.registry.track(&scope, &internal, symbol)
    }

    /// [`HostIsolate::builtin_symbol`] by raw index (1..=11)
    pub fn builtin_symbol_by_index(&self, index: i32) -> BridgeResult<ValueRef> {
        let index = SymbolIndex::from_i32(index).ok_or(BridgeError::InvalidSymbolIndex(index))?;
        self.builtin_symbol(index)
    }

    /// Description text of a symbol
    pub fn symbol_description(&self, symbol: ValueRef) -> BridgeResult<String> {
        let scope = HandleScope::new(&self.isolate);
        let value = self.shared.registry.resolve_value(&scope, symbol)?;
        let id = value.as_symbol().ok_or(BridgeError::NotASymbol(symbol))?;
        Ok(scope.symbol_description(id).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobridge_sdk::{BridgeContext, NoopHostCallback};

    #[test]
    fn test_builtin_symbols_are_tracked_internally() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let symbol = host.builtin_symbol(SymbolIndex::Iterator).unwrap();
        assert_eq!(symbol.ctx_ref, CtxRef::INTERNAL);
        assert_eq!(host.tracked_count(CtxRef::INTERNAL), Some(1));
        assert_eq!(host.symbol_description(symbol).unwrap(), "Symbol.iterator");
    }

    #[test]
    fn test_invalid_index() {
        let host = HostIsolate::with_host(NoopHostCallback);
        assert_eq!(
            host.builtin_symbol_by_index(0),
            Err(BridgeError::InvalidSymbolIndex(0))
        );
        assert_eq!(
            host.builtin_symbol_by_index(12),
            Err(BridgeError::InvalidSymbolIndex(12))
        );
        assert!(host.builtin_symbol_by_index(11).is_ok());
    }

    #[test]
    fn test_description_of_non_symbol() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let ctx = host.create_context().unwrap();
        let string = host.scope(ctx).new_string("x").unwrap();
        assert_eq!(
            host.symbol_description(string),
            Err(BridgeError::NotASymbol(string))
        );
    }
}
