/// Platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub i64);

/// Platform chat id (numeric). For private chats this equals the user id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Platform message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// The fixed set of operator accounts, loaded once at startup and never
/// mutated afterwards.
#[derive(Clone, Debug)]
pub struct AdminSet {
    ids: Vec<UserId>,
}

impl AdminSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut ids: Vec<UserId> = ids.into_iter().map(UserId).collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.ids.contains(&user)
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_set_membership() {
        let admins = AdminSet::new([10, 20, 20]);
        assert!(admins.contains(UserId(10)));
        assert!(!admins.contains(UserId(30)));
        assert_eq!(admins.len(), 2);
    }
}
