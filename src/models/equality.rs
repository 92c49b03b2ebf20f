//! Structural equality in a fast boolean form and a diagnostic form.
//!
//! Both forms are generated from the same field list by
//! [`impl_structural_eq!`], so they cannot disagree. Sequence fields are
//! compared positionally; a length mismatch or the first differing index is
//! reported by the diagnostic form.

use std::fmt;

/// First differing field between two values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Field name, with `[index]` appended for sequence elements
    pub field: String,
    /// Rendering of the left-hand value
    pub this: String,
    /// Rendering of the right-hand value
    pub that: String,
}

impl Mismatch {
    pub fn new(field: impl Into<String>, this: impl fmt::Debug, that: impl fmt::Debug) -> Self {
        Self {
            field: field.into(),
            this: format!("{this:?}"),
            that: format!("{that:?}"),
        }
    }

    /// Mismatch where one side is absent.
    pub fn absent(type_name: &str, this_present: bool) -> Self {
        let render = |present: bool| if present { "<present>" } else { "<absent>" };
        Self {
            field: type_name.to_string(),
            this: render(this_present).to_string(),
            that: render(!this_present).to_string(),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} this({}) != that({})", self.field, self.this, self.that)
    }
}

/// Own-level equality of a catalog node.
///
/// Deeper structural children (courses of a subject, sections of a course)
/// are not part of this comparison; the differ walks them itself.
pub trait StructuralEq {
    /// Name used in diagnostics for absent values.
    const TYPE_NAME: &'static str;

    /// Fast equality, short-circuits on the first differing field.
    fn structural_eq(&self, other: &Self) -> bool;

    /// Returns the first differing field, or `None` when equal.
    fn first_mismatch(&self, other: &Self) -> Option<Mismatch>;
}

/// Boolean equality accepting absent values on either side.
pub fn equal<T: StructuralEq>(this: Option<&T>, that: Option<&T>) -> bool {
    match (this, that) {
        (None, None) => true,
        (Some(a), Some(b)) => a.structural_eq(b),
        _ => false,
    }
}

/// Diagnostic equality accepting absent values on either side.
///
/// Returns `Ok(())` exactly when [`equal`] returns `true`.
pub fn verbose_equal<T: StructuralEq>(this: Option<&T>, that: Option<&T>) -> Result<(), Mismatch> {
    match (this, that) {
        (None, None) => Ok(()),
        (Some(a), Some(b)) => a.first_mismatch(b).map_or(Ok(()), Err),
        (Some(_), None) => Err(Mismatch::absent(T::TYPE_NAME, true)),
        (None, Some(_)) => Err(Mismatch::absent(T::TYPE_NAME, false)),
    }
}

/// Positional comparison of two sequences for the diagnostic form.
pub fn first_sequence_mismatch<T>(field: &str, this: &[T], that: &[T]) -> Option<Mismatch>
where
    T: PartialEq + fmt::Debug,
{
    if this.len() != that.len() {
        return Some(Mismatch {
            field: field.to_string(),
            this: format!("len {}", this.len()),
            that: format!("len {}", that.len()),
        });
    }
    this.iter()
        .zip(that)
        .position(|(a, b)| a != b)
        .map(|i| Mismatch::new(format!("{field}[{i}]"), &this[i], &that[i]))
}

/// Implements [`StructuralEq`] from one list of scalar and sequence fields.
macro_rules! impl_structural_eq {
    ($ty:ty, $name:literal { scalars: [$($scalar:ident),* $(,)?], sequences: [$($seq:ident),* $(,)?] $(,)? }) => {
        impl $crate::models::equality::StructuralEq for $ty {
            const TYPE_NAME: &'static str = $name;

            fn structural_eq(&self, other: &Self) -> bool {
                true $(&& self.$scalar == other.$scalar)* $(&& self.$seq == other.$seq)*
            }

            fn first_mismatch(&self, other: &Self) -> Option<$crate::models::equality::Mismatch> {
                $(
                    if self.$scalar != other.$scalar {
                        return Some($crate::models::equality::Mismatch::new(
                            stringify!($scalar),
                            &self.$scalar,
                            &other.$scalar,
                        ));
                    }
                )*
                $(
                    if let Some(mismatch) = $crate::models::equality::first_sequence_mismatch(
                        stringify!($seq),
                        &self.$seq,
                        &other.$seq,
                    ) {
                        return Some(mismatch);
                    }
                )*
                None
            }
        }
    };
}

pub(crate) use impl_structural_eq;
