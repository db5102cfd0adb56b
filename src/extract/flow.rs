use crate::model::{Message, Side, UNKNOWN_SENDER};

/// Assign each message a chat-layout side.
///
/// A clean two-party exchange pins every message of the dominant sender to
/// the left and the other party to the right, regardless of position. Any
/// other sender count falls back to strict position parity. Derived fresh on
/// every render; never cached.
pub fn assign_sides(messages: &[Message]) -> Vec<Side> {
    // counts in first-encounter order so ties resolve to the earlier sender
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for message in messages {
        let sender = normalize(&message.sender);
        match counts.iter_mut().find(|(name, _)| *name == sender) {
            Some((_, count)) => *count += 1,
            None => counts.push((sender, 1)),
        }
    }

    if counts.len() == 2 {
        let primary = if counts[1].1 > counts[0].1 {
            counts[1].0
        } else {
            counts[0].0
        };
        messages
            .iter()
            .map(|message| {
                if normalize(&message.sender) == primary {
                    Side::Left
                } else {
                    Side::Right
                }
            })
            .collect()
    } else {
        (0..messages.len())
            .map(|i| if i % 2 == 0 { Side::Right } else { Side::Left })
            .collect()
    }
}

fn normalize(sender: &str) -> &str {
    let trimmed = sender.trim();
    if trimmed.is_empty() {
        UNKNOWN_SENDER
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str) -> Message {
        Message::new(sender, "", "x")
    }

    #[test]
    fn dominant_sender_goes_left_everywhere() {
        let messages = vec![msg("A"), msg("B"), msg("A"), msg("A")];
        let sides = assign_sides(&messages);
        assert_eq!(sides, vec![Side::Left, Side::Right, Side::Left, Side::Left]);
    }

    #[test]
    fn tie_goes_to_first_encountered() {
        let messages = vec![msg("B"), msg("A"), msg("B"), msg("A")];
        let sides = assign_sides(&messages);
        assert_eq!(sides, vec![Side::Left, Side::Right, Side::Left, Side::Right]);
    }

    #[test]
    fn three_senders_alternate_by_position() {
        let messages = vec![msg("A"), msg("B"), msg("C"), msg("A")];
        let sides = assign_sides(&messages);
        assert_eq!(
            sides,
            vec![Side::Right, Side::Left, Side::Right, Side::Left]
        );
    }

    #[test]
    fn single_sender_alternates_by_position() {
        let messages = vec![msg("A"), msg("A"), msg("A")];
        let sides = assign_sides(&messages);
        assert_eq!(sides, vec![Side::Right, Side::Left, Side::Right]);
    }

    #[test]
    fn empty_list_is_empty() {
        assert!(assign_sides(&[]).is_empty());
    }

    #[test]
    fn blank_sender_counts_as_unknown() {
        let messages = vec![msg(""), msg("A"), msg(""), msg("")];
        let sides = assign_sides(&messages);
        // "" normalizes to Unknown: two distinct senders, Unknown dominates
        assert_eq!(sides, vec![Side::Left, Side::Right, Side::Left, Side::Left]);
    }
}
