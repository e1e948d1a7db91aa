//! Input policy enforcement on resource instances.

use tracing::debug;

use super::{
    context::{Context, InputDecision, Violation, input_policy},
    definition::Scope,
    error::{ScimError, ScimResult},
    resource::Resource,
    schema::{Mutability, Returned, SchemaAttribute},
    value::{Complex, Value},
};

/// Validate `resource` for `context`.
///
/// Values the context tolerates but ignores (read-only attributes echoed in a
/// replacement request) are removed from the instance. Replacement requests
/// need the `original` resource to check immutable attributes against.
pub fn validate(
    resource: &mut Resource,
    context: Context,
    original: Option<&Resource>,
) -> ScimResult<()> {
    if context == Context::ResourceReplacementRequest && original.is_none() {
        return Err(ScimError::bad_request(
            "Replacement request validation requires the original resource",
        ));
    }
    if context == Context::Default {
        return Ok(());
    }

    let definition = resource.definition().clone();
    check_complex(definition.attributes(), resource.attributes_mut(), "", context)?;

    for (index, ext) in definition.extensions().iter().enumerate() {
        match resource.extension_mut(index) {
            Some(complex) => {
                let prefix = format!("{}:", ext.schema.id);
                check_complex(&ext.schema.attributes, complex, &prefix, context)?
            }
            None if ext.required && matches!(
                context,
                Context::ResourceCreationRequest | Context::ResourceReplacementRequest
            ) => {
                return Err(Violation::Required.to_error(&ext.schema.id, context));
            }
            None => {}
        }
    }

    if let Some(original) = original
        && context == Context::ResourceReplacementRequest
    {
        check_immutable(definition.attributes(), resource.attributes(), original.attributes(), "")?;
        for (index, ext) in definition.extensions().iter().enumerate() {
            let scope = Scope::Extension(index);
            if let (Some(new), Some(old)) = (resource.scope(scope), original.scope(scope)) {
                check_immutable(&ext.schema.attributes, new, old, &format!("{}:", ext.schema.id))?;
            }
        }
    }

    resource.sync_schemas();
    Ok(())
}

fn check_complex(
    attributes: &[SchemaAttribute],
    complex: &mut Complex,
    prefix: &str,
    context: Context,
) -> ScimResult<()> {
    for attr in attributes {
        let present = complex.contains_key(&attr.name);
        let name = format!("{prefix}{}", attr.name);
        match input_policy(context, attr, present) {
            InputDecision::Allow => {}
            InputDecision::Drop => {
                debug!(attribute = %name, %context, "Dropping read-only attribute");
                complex.remove(&attr.name);
                continue;
            }
            InputDecision::Reject(violation) => return Err(violation.to_error(&name, context)),
        }

        if !attr.is_complex() {
            continue;
        }
        let sub_prefix = format!("{name}.");
        match complex.get_mut(&attr.name) {
            Some(Value::Complex(inner)) => {
                check_complex(&attr.sub_attributes, inner, &sub_prefix, context)?
            }
            Some(Value::Multi(items)) => {
                for item in items.iter_mut() {
                    if let Value::Complex(inner) = item {
                        check_complex(&attr.sub_attributes, inner, &sub_prefix, context)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Reject immutable values that differ from the original. Recurses into
/// single-valued complex attributes present on both sides.
fn check_immutable(
    attributes: &[SchemaAttribute],
    new: &Complex,
    old: &Complex,
    prefix: &str,
) -> ScimResult<()> {
    for attr in attributes {
        let Some(value) = new.get(&attr.name) else {
            continue;
        };
        let name = format!("{prefix}{}", attr.name);
        if attr.mutability() == Mutability::Immutable && old.get(&attr.name) != Some(value) {
            return Err(Violation::Immutable.to_error(&name, Context::ResourceReplacementRequest));
        }
        if attr.is_complex()
            && !attr.multi_valued
            && let (Value::Complex(new_inner), Some(Value::Complex(old_inner))) =
                (value, old.get(&attr.name))
        {
            check_immutable(&attr.sub_attributes, new_inner, old_inner, &format!("{name}."))?;
        }
    }
    Ok(())
}

/// Check that every `returned: always` attribute is set, as responses require.
pub(crate) fn check_returned(resource: &Resource, context: Context) -> ScimResult<()> {
    let definition = resource.definition();
    check_always(definition.attributes(), resource.attributes(), "", context)?;
    for (index, ext) in definition.extensions().iter().enumerate() {
        if let Some(complex) = resource.scope(Scope::Extension(index)) {
            check_always(&ext.schema.attributes, complex, &format!("{}:", ext.schema.id), context)?;
        }
    }
    Ok(())
}

fn check_always(
    attributes: &[SchemaAttribute],
    complex: &Complex,
    prefix: &str,
    context: Context,
) -> ScimResult<()> {
    for attr in attributes {
        let name = format!("{prefix}{}", attr.name);
        match complex.get(&attr.name) {
            None if attr.returned() == Returned::Always => {
                return Err(Violation::ReturnedAlways.to_error(&name, context));
            }
            Some(Value::Complex(inner)) => {
                check_always(&attr.sub_attributes, inner, &format!("{name}."), context)?
            }
            _ => {}
        }
    }
    Ok(())
}
