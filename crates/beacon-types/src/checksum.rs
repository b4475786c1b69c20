//! Registry consistency checksum
//!
//! The checksum lets a client that has been patching its local cache with
//! deltas verify that it converged to the same logical state the server
//! holds. It must be reproducible from the same logical state regardless of
//! internal iteration order, so tuples are sorted before hashing.

use crate::InstanceStatus;

/// Compute the checksum over (application name, instance id, status) tuples.
///
/// Both the server's response cache and the client cache feed their current
/// view through this; equal output means equal logical registry content.
pub fn registry_checksum<'a, I>(tuples: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str, InstanceStatus)>,
{
    let mut sorted: Vec<(&str, &str, InstanceStatus)> = tuples.into_iter().collect();
    sorted.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for (app, id, status) in sorted {
        hasher.update(app.as_bytes());
        hasher.update(b"|");
        hasher.update(id.as_bytes());
        hasher.update(b"|");
        hasher.update(status.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_independent() {
        let a = registry_checksum(vec![
            ("billing", "i-1", InstanceStatus::Up),
            ("auth", "i-2", InstanceStatus::Down),
        ]);
        let b = registry_checksum(vec![
            ("auth", "i-2", InstanceStatus::Down),
            ("billing", "i-1", InstanceStatus::Up),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn status_changes_checksum() {
        let up = registry_checksum(vec![("billing", "i-1", InstanceStatus::Up)]);
        let down = registry_checksum(vec![("billing", "i-1", InstanceStatus::Down)]);
        assert_ne!(up, down);
    }

    #[test]
    fn status_orders_tuples_sharing_app_and_id() {
        // Duplicate (app, id) pairs fall back to status order when sorting,
        // so permuted input still hashes identically.
        let a = registry_checksum(vec![
            ("billing", "i-1", InstanceStatus::Up),
            ("billing", "i-1", InstanceStatus::Down),
        ]);
        let b = registry_checksum(vec![
            ("billing", "i-1", InstanceStatus::Down),
            ("billing", "i-1", InstanceStatus::Up),
        ]);
        assert_eq!(a, b);
        assert!(InstanceStatus::Starting < InstanceStatus::Unknown);
    }

    #[test]
    fn empty_input_is_stable() {
        let a = registry_checksum(std::iter::empty());
        let b = registry_checksum(std::iter::empty());
        assert_eq!(a, b);
    }
}
