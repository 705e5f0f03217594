//! Subtask partitioning across teams.

/// Splits `subtasks` round-robin over `extra_teams + 1` slots.
///
/// Slot 0 belongs to the originating team; slot `k` to the `k`-th spawned
/// team. Subtask `i` lands in slot `i % (extra_teams + 1)`. A spawned
/// team's slot that would be empty gets a single `Parallel work {k}`
/// placeholder; the originating team's slot may stay empty.
pub fn partition(subtasks: &[String], extra_teams: usize) -> Vec<Vec<String>> {
    let slots = extra_teams + 1;
    let mut out = vec![Vec::new(); slots];
    for (i, subtask) in subtasks.iter().enumerate() {
        out[i % slots].push(subtask.clone());
    }
    for (k, slot) in out.iter_mut().enumerate().skip(1) {
        if slot.is_empty() {
            slot.push(format!("Parallel work {}", k));
        }
    }
    out
}
