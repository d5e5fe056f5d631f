//! Template builder
//!
//! Templates only ever carry a `callback_ref` as callback data; the native
//! callback is always one of the dispatcher's trampolines.

use super::dispatch;
use super::handle::Template;
use super::HostIsolate;
use crate::native::{
    IndexedPropertyHandlerConfiguration, PropertyHandlerFlags, PropertyKey, TemplateKind, Value,
};
use isobridge_sdk::{BridgeError, BridgeResult, CallbackRef, CtxRef, PropertyAttribute, ValueRef};

impl HostIsolate {
    /// Function template whose calls dispatch to `callback_ref`
    pub fn new_function_template(&self, callback_ref: CallbackRef) -> Template {
        let locker = self.isolate.lock();
        let id = locker.new_function_template(
            Some(dispatch::function_callback),
            Value::from(callback_ref.as_i32()),
        );
        tracing::trace!(%callback_ref, "function template created");
        Template::new(self.isolate.id(), id, TemplateKind::Function)
    }

    /// The template's function in `ctx_ref`. One instance per context.
    pub fn function_template_get_function(
        &self,
        template: &Template,
        ctx_ref: CtxRef,
    ) -> BridgeResult<ValueRef> {
        self.scope(ctx_ref).get_function(template)
    }

    /// Empty object template
    pub fn new_object_template(&self) -> Template {
        let id = self.isolate.lock().new_object_template();
        Template::new(self.isolate.id(), id, TemplateKind::Object)
    }

    /// Create an instance bound to `ctx_ref`. Construction failures carry
    /// the engine's exception tagged with the context.
    pub fn instantiate(&self, template: &Template, ctx_ref: CtxRef) -> BridgeResult<ValueRef> {
        self.scope(ctx_ref).new_instance(template)
    }

    /// Set the number of internal fields of future instances
    pub fn set_internal_field_count(&self, template: &Template, count: usize) -> BridgeResult<()> {
        let id = template.check(self.isolate.id(), TemplateKind::Object)?;
        self.isolate.lock().set_internal_field_count(id, count);
        Ok(())
    }

    /// Internal field count of an object template
    pub fn internal_field_count(&self, template: &Template) -> BridgeResult<usize> {
        let id = template.check(self.isolate.id(), TemplateKind::Object)?;
        self.isolate
            .lock()
            .template_internal_field_count(id)
            .ok_or(BridgeError::TemplateKind {
                expected: TemplateKind::Object.name(),
                got: TemplateKind::Function.name(),
            })
    }

    /// Accessor property backed by function templates. Either side may be
    /// absent; without a setter, writes are ignored.
    pub fn set_accessor_property(
        &self,
        template: &Template,
        key: &str,
        getter: Option<&Template>,
        setter: Option<&Template>,
        attributes: PropertyAttribute,
    ) -> BridgeResult<()> {
        let id = template.check(self.isolate.id(), TemplateKind::Object)?;
        let getter = getter
            .map(|t| t.check(self.isolate.id(), TemplateKind::Function))
            .transpose()?;
        let setter = setter
            .map(|t| t.check(self.isolate.id(), TemplateKind::Function))
            .transpose()?;
        self.isolate
            .lock()
            .set_accessor_property(id, PropertyKey::from(key), getter, setter, attributes);
        Ok(())
    }

    /// Indexed-property getter dispatching to `callback_ref`. The handler is
    /// declared side-effect free.
    pub fn set_indexed_handler(&self, template: &Template, callback_ref: CallbackRef) -> BridgeResult<()> {
        let id = template.check(self.isolate.id(), TemplateKind::Object)?;
        let config = IndexedPropertyHandlerConfiguration {
            getter: dispatch::indexed_getter,
            data: Value::from(callback_ref.as_i32()),
            flags: PropertyHandlerFlags::HAS_NO_SIDE_EFFECT,
        };
        self.isolate.lock().set_indexed_property_handler(id, config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobridge_sdk::{BridgeContext, NoopHostCallback};

    #[test]
    fn test_internal_field_count_round_trip() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let template = host.new_object_template();
        assert_eq!(host.internal_field_count(&template), Ok(0));
        host.set_internal_field_count(&template, 2).unwrap();
        assert_eq!(host.internal_field_count(&template), Ok(2));
    }

    #[test]
    fn test_kind_mismatch() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let function = host.new_function_template(CallbackRef(1));
        let object = host.new_object_template();

        assert!(matches!(
            host.set_internal_field_count(&function, 1),
            Err(BridgeError::TemplateKind { .. })
        ));
        assert!(matches!(
            host.set_accessor_property(&object, "x", Some(&object), None, PropertyAttribute::NONE),
            Err(BridgeError::TemplateKind { .. })
        ));
        let ctx = host.create_context().unwrap();
        assert!(matches!(
            host.instantiate(&function, ctx),
            Err(BridgeError::TemplateKind { .. })
        ));
    }

    #[test]
    fn test_foreign_template() {
        let a = HostIsolate::with_host(NoopHostCallback);
        let b = HostIsolate::with_host(NoopHostCallback);
        let template = a.new_object_template();
        assert_eq!(
            b.set_indexed_handler(&template, CallbackRef(1)),
            Err(BridgeError::ForeignTemplate)
        );
    }

    #[test]
    fn test_instances_get_internal_fields() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let ctx = host.create_context().unwrap();
        let template = host.new_object_template();
        host.set_internal_field_count(&template, 2).unwrap();
        let object = host.instantiate(&template, ctx).unwrap();

        let cx = host.scope(ctx);
        assert_eq!(cx.internal_field_count(object), Ok(2));
        let marker = cx.new_string("payload").unwrap();
        cx.set_internal_field(object, 1, marker).unwrap();
        let field = cx.internal_field(object, 1).unwrap();
        assert_eq!(cx.value_to_string(field).unwrap(), "payload");
        assert_eq!(
            cx.internal_field(object, 2),
            Err(BridgeError::InternalFieldOutOfRange { index: 2, count: 2 })
        );
    }
}
