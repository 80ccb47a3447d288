//! Run counters for the two entities and the emulated link.

use std::fmt;

/// Counters kept by [`crate::sender::SrSender`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// First transmissions of data packets.
    pub packets_sent: u64,
    /// Data packets sent again after a timeout.
    pub packets_resent: u64,
    /// `submit` calls rejected because the window was full.
    pub window_full: u64,
    /// Uncorrupted acknowledgements received.
    pub total_acks_received: u64,
    /// Acknowledgements that marked a packet for the first time.
    pub new_acks: u64,
}

/// Counters kept by [`crate::receiver::SrReceiver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Uncorrupted data packets received.
    pub packets_received: u64,
    /// Payloads handed to the application.
    pub delivered: u64,
    /// Packets already buffered or already delivered.
    pub duplicates: u64,
}

/// Counters kept by the emulated link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStats {
    /// Packets handed to the link by either entity.
    pub to_layer3: u64,
    pub lost: u64,
    pub corrupted: u64,
    /// Payloads handed to the application at B.
    pub to_layer5: u64,
    /// Application messages generated at A.
    pub messages_generated: u64,
    /// Simulated clock at the end of the run.
    pub simulated_time: f64,
}

/// Everything counted during one emulation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    pub channel: ChannelStats,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.sender;
        let r = &self.receiver;
        let c = &self.channel;
        writeln!(f, "Simulated time:                        {:.3}", c.simulated_time)?;
        writeln!(f, "Messages generated at A:               {}", c.messages_generated)?;
        writeln!(f, "Messages rejected (window full):       {}", s.window_full)?;
        writeln!(f, "Packets sent by A:                     {}", s.packets_sent)?;
        writeln!(f, "Packets resent by A:                   {}", s.packets_resent)?;
        writeln!(f, "ACKs received by A:                    {}", s.total_acks_received)?;
        writeln!(f, "New ACKs received by A:                {}", s.new_acks)?;
        writeln!(f, "Packets received by B:                 {}", r.packets_received)?;
        writeln!(f, "Duplicate packets at B:                {}", r.duplicates)?;
        writeln!(f, "Messages delivered to layer 5 at B:    {}", c.to_layer5)?;
        writeln!(f, "Packets passed to the link:            {}", c.to_layer3)?;
        writeln!(f, "Packets lost:                          {}", c.lost)?;
        write!(f, "Packets corrupted:                     {}", c.corrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_every_counter() {
        let summary = Summary {
            sender: SenderStats {
                packets_resent: 3,
                ..Default::default()
            },
            channel: ChannelStats {
                lost: 7,
                ..Default::default()
            },
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.contains("Packets resent by A:                   3"));
        assert!(text.contains("Packets lost:                          7"));
        assert_eq!(text.lines().count(), 13);
    }
}
