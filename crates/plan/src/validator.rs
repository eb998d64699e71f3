//! Admission checks for migration plans.

use thiserror::Error;
use tracing::debug;

use crate::types::MigrationPlanSpec;

/// Reasons a plan is refused. Display text is matched by callers; keep it stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cutover start time is after cutover end time")]
    CutoverWindowInverted,

    #[error("advanced options can only be set for a single VM")]
    AdvancedOptionsRequireSingleVm { vm_count: usize },
}

/// Check a plan before it is accepted for execution.
///
/// Checks run in order and the first failure is returned.
///
/// # Errors
///
/// - [`ValidationError::CutoverWindowInverted`] if `cutover_start > cutover_end`
/// - [`ValidationError::AdvancedOptionsRequireSingleVm`] if advanced options
///   are set and the plan does not name exactly one VM
pub fn validate(plan: &MigrationPlanSpec) -> Result<(), ValidationError> {
    if plan.cutover_start > plan.cutover_end {
        debug!(
            start = %plan.cutover_start,
            end = %plan.cutover_end,
            "Rejecting plan with inverted cutover window"
        );
        return Err(ValidationError::CutoverWindowInverted);
    }

    let vm_count = plan.virtual_machines.total_vm_count();
    if plan.advanced_options.is_set() && vm_count != 1 {
        debug!(vm_count, "Rejecting advanced options on multi-VM plan");
        return Err(ValidationError::AdvancedOptionsRequireSingleVm { vm_count });
    }

    Ok(())
}
