//! Transfer robot helper and canned test routines.
//!
//! `TransferRobot` wraps the prototype's axes behind one state-holding
//! handle: the feed magazine that carries sample sockets, the claw that
//! grips them, and the manipulator arm. Only the feed-positioning path is
//! implemented on the prototype so far; arm extension and claw release are
//! still open.

use crate::capabilities::{Positioner, Switch};
use crate::error::{Result, TransferError};
use std::collections::HashMap;
use std::sync::Arc;

/// State-holding helper for the prototype transfer robot.
pub struct TransferRobot {
    /// Feed socket number to feed-axis position.
    socket_map: HashMap<usize, f64>,
    /// Magazine feed axis.
    pub feed: Arc<dyn Positioner>,
    /// Gripper axis.
    pub claw: Arc<dyn Positioner>,
    /// Manipulator arm axis.
    pub manip: Arc<dyn Positioner>,
    /// Gripper feedback line.
    pub sample_sensor: Arc<dyn Switch>,
}

impl TransferRobot {
    pub fn new(
        feed: Arc<dyn Positioner>,
        claw: Arc<dyn Positioner>,
        manip: Arc<dyn Positioner>,
        sample_sensor: Arc<dyn Switch>,
    ) -> Self {
        // Sockets 0 and 1 of the prototype magazine.
        let socket_map = HashMap::from([(0, 0.0), (1, 5.5)]);
        Self {
            socket_map,
            feed,
            claw,
            manip,
            sample_sensor,
        }
    }

    /// Whether the claw currently holds a sample.
    ///
    /// TODO: read `sample_sensor` once the gripper feedback line is wired
    /// into the prototype's GPIO block.
    pub fn has_sample(&self) -> bool {
        false
    }

    /// Put the grasped sample into socket `n`.
    ///
    /// Fails with [`TransferError::NoSampleHeld`] unless the claw holds a
    /// sample. Arm extension and claw release are not implemented on the
    /// prototype yet; only the feed move happens.
    pub async fn put_in_socket(&self, n: usize) -> Result<()> {
        if !self.has_sample() {
            return Err(TransferError::NoSampleHeld);
        }
        self.set_feed_socket(n).await?;
        Ok(())
    }

    /// Move socket `n` into the claw's reach.
    pub async fn set_feed_socket(&self, n: usize) -> Result<()> {
        let target = *self
            .socket_map
            .get(&n)
            .ok_or(TransferError::UnknownSocket(n))?;
        tracing::debug!(socket = n, target, "positioning feed");
        self.feed.move_to(target).await?;
        Ok(())
    }
}

/// Canned test routine: rotate the claw axis 0° → 5° → 0°.
///
/// The return value only signals pass/fail; a failed move surfaces as the
/// attempt's failure in the run loop.
pub async fn simple_rotation(rot: &dyn Positioner) -> anyhow::Result<()> {
    rot.move_to(0.0).await?;
    rot.move_to(5.0).await?;
    rot.move_to(0.0).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPositioner, MockSwitch};

    fn robot() -> TransferRobot {
        TransferRobot::new(
            Arc::new(MockPositioner::new("feed")),
            Arc::new(MockPositioner::new("claw")),
            Arc::new(MockPositioner::new("manip")),
            Arc::new(MockSwitch::new(false)),
        )
    }

    #[tokio::test]
    async fn test_put_in_socket_requires_sample() {
        let robot = robot();
        let err = robot.put_in_socket(1).await.unwrap_err();
        assert!(matches!(err, TransferError::NoSampleHeld));
        // guard fires before any motion
        assert_eq!(robot.feed.position().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_set_feed_socket_moves_to_mapped_position() {
        let robot = robot();
        robot.set_feed_socket(1).await.unwrap();
        assert_eq!(robot.feed.position().await.unwrap(), 5.5);

        robot.set_feed_socket(0).await.unwrap();
        assert_eq!(robot.feed.position().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_socket_is_an_error() {
        let robot = robot();
        let err = robot.set_feed_socket(7).await.unwrap_err();
        assert!(matches!(err, TransferError::UnknownSocket(7)));
    }

    #[tokio::test]
    async fn test_simple_rotation_ends_at_zero() {
        let rot = MockPositioner::new("rot");
        simple_rotation(&rot).await.unwrap();
        assert_eq!(rot.position().await.unwrap(), 0.0);
        assert_eq!(rot.move_count(), 3);
    }
}
