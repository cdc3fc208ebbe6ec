/// Execute an aggregate command deterministically (no IO, no async).
///
/// Canonical lifecycle in one step:
///
/// 1. **Decide**: `aggregate.handle(command)` produces events (no mutation).
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`.
///
/// Mutates the aggregate in place. For the full pipeline (persistence,
/// publication, optimistic concurrency) use the infra command dispatcher;
/// this helper is for unit tests and inline processing.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: tradepost_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
