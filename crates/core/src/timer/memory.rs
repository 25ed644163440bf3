/// True when `current_index` is the last image a memory drill covers.
#[must_use]
pub fn should_end_memory_session(current_index: usize, memory_poses_count: usize) -> bool {
    current_index.saturating_add(1) >= memory_poses_count
}

/// Next position in a wrap-around image list; `0` for an empty list.
#[must_use]
pub fn next_cyclic_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        current.saturating_add(1) % len
    }
}
