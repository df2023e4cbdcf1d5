use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::message::Message;

/// Anything that can be placed into a conversation thread.
pub trait Conversational {
    fn conversation_key(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Conversational for Message {
    fn conversation_key(&self) -> &str {
        &self.conversation_key
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Messages sharing one conversation key, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread<T> {
    pub key: String,
    pub messages: Vec<T>,
}

impl<T> Thread<T> {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Partitions `messages` by conversation key.
///
/// Threads come back in first-seen key order. Within a thread the sort is
/// stable, so messages with identical timestamps keep their arrival order.
pub fn group_by_conversation<T: Conversational>(messages: Vec<T>) -> Vec<Thread<T>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut threads: Vec<Thread<T>> = Vec::new();

    for message in messages {
        let key = message.conversation_key().to_string();
        match index.get(&key) {
            Some(&slot) => threads[slot].messages.push(message),
            None => {
                index.insert(key.clone(), threads.len());
                threads.push(Thread {
                    key,
                    messages: vec![message],
                });
            }
        }
    }

    for thread in &mut threads {
        thread.messages.sort_by_key(|message| message.timestamp());
    }
    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: &'static str,
        at: i64,
        tag: u32,
    }

    impl Conversational for Item {
        fn conversation_key(&self) -> &str {
            self.key
        }

        fn timestamp(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.at, 0).unwrap()
        }
    }

    fn item(key: &'static str, at: i64, tag: u32) -> Item {
        Item { key, at, tag }
    }

    #[test]
    fn empty_input_has_no_threads() {
        assert!(group_by_conversation::<Item>(Vec::new()).is_empty());
    }

    #[test]
    fn groups_form_a_partition() {
        let input = vec![
            item("a", 3, 1),
            item("b", 1, 2),
            item("a", 1, 3),
            item("c", 9, 4),
            item("b", 0, 5),
        ];
        let threads = group_by_conversation(input.clone());
        assert_eq!(
            threads.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        let total: usize = threads.iter().map(|t| t.len()).sum();
        assert_eq!(total, input.len());
        let mut tags: Vec<u32> = threads
            .iter()
            .flat_map(|t| t.messages.iter().map(|m| m.tag))
            .collect();
        tags.sort();
        assert_eq!(tags, vec![1, 2, 3, 4, 5]);
        for thread in &threads {
            assert!(thread.messages.iter().all(|m| m.key == thread.key));
        }
    }

    #[test]
    fn sorts_by_time_keeping_arrival_order_on_ties() {
        let threads = group_by_conversation(vec![
            item("a", 5, 1),
            item("a", 2, 2),
            item("a", 5, 3),
            item("a", 2, 4),
        ]);
        let tags: Vec<u32> = threads[0].messages.iter().map(|m| m.tag).collect();
        assert_eq!(tags, vec![2, 4, 1, 3]);
    }
}
