use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::platform::UserId;

/// Commands that can be handed out through the whitelist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Dm,
    Msg,
    Nuke,
    Ban,
    Mute,
    Warn,
}

impl CommandName {
    pub const ALL: [CommandName; 6] = [
        CommandName::Dm,
        CommandName::Msg,
        CommandName::Nuke,
        CommandName::Ban,
        CommandName::Mute,
        CommandName::Warn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Dm => "dm",
            CommandName::Msg => "msg",
            CommandName::Nuke => "nuke",
            CommandName::Ban => "ban",
            CommandName::Mute => "mute",
            CommandName::Warn => "warn",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = WhitelistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| WhitelistError::UnknownCommand(s.to_string()))
    }
}

/// One entry of a user's grant list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    All,
    Command(CommandName),
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::All => f.write_str("all"),
            Permission::Command(c) => c.fmt(f),
        }
    }
}

impl FromStr for Permission {
    type Err = WhitelistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        if s == "all" {
            Ok(Permission::All)
        } else {
            s.parse().map(Permission::Command)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WhitelistError {
    #[error("only the bot owner may change the whitelist")]
    NotOwner,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("user is not whitelisted")]
    NotWhitelisted,
}

/// Result of a successful grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granted {
    All,
    Command(CommandName),
    /// The user could already run the command
    Unchanged,
}

/// In-memory authorization list. The owner is never stored and can run
/// everything.
#[derive(Debug)]
pub struct Whitelist {
    owner: UserId,
    entries: BTreeMap<UserId, Vec<Permission>>,
}

impl Whitelist {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        user == self.owner
    }

    pub fn is_authorized(&self, user: UserId, command: CommandName) -> bool {
        if self.is_owner(user) {
            return true;
        }
        self.entries.get(&user).is_some_and(|perms| {
            perms
                .iter()
                .any(|p| matches!(p, Permission::All) || *p == Permission::Command(command))
        })
    }

    /// Replace the user's grants with blanket access
    pub fn grant_all(&mut self, caller: UserId, user: UserId) -> Result<Granted, WhitelistError> {
        self.ensure_owner(caller)?;
        self.entries.insert(user, vec![Permission::All]);
        Ok(Granted::All)
    }

    pub fn grant(
        &mut self,
        caller: UserId,
        user: UserId,
        permission: Permission,
    ) -> Result<Granted, WhitelistError> {
        self.ensure_owner(caller)?;
        let command = match permission {
            Permission::All => return self.grant_all(caller, user),
            Permission::Command(c) => c,
        };
        let perms = self.entries.entry(user).or_default();
        if perms.contains(&Permission::All) || perms.contains(&permission) {
            return Ok(Granted::Unchanged);
        }
        perms.push(permission);
        Ok(Granted::Command(command))
    }

    /// Remove every grant the user holds
    pub fn revoke_all(&mut self, caller: UserId, user: UserId) -> Result<(), WhitelistError> {
        self.ensure_owner(caller)?;
        self.entries
            .remove(&user)
            .map(|_| ())
            .ok_or(WhitelistError::NotWhitelisted)
    }

    /// Snapshot of all entries, ordered by user id
    pub fn list(&self, caller: UserId) -> Result<Vec<(UserId, Vec<Permission>)>, WhitelistError> {
        self.ensure_owner(caller)?;
        Ok(self
            .entries
            .iter()
            .map(|(user, perms)| (*user, perms.clone()))
            .collect())
    }

    fn ensure_owner(&self, caller: UserId) -> Result<(), WhitelistError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(WhitelistError::NotOwner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: UserId = 1;
    const ALICE: UserId = 2;
    const BOB: UserId = 3;

    #[test]
    fn test_owner_is_always_authorized() {
        let mut list = Whitelist::new(OWNER);
        for command in CommandName::ALL {
            assert!(list.is_authorized(OWNER, command));
        }
        list.grant(OWNER, ALICE, Permission::Command(CommandName::Dm))
            .unwrap();
        list.revoke_all(OWNER, ALICE).unwrap();
        for command in CommandName::ALL {
            assert!(list.is_authorized(OWNER, command));
        }
    }

    #[test]
    fn test_unknown_user_is_denied() {
        let list = Whitelist::new(OWNER);
        for command in CommandName::ALL {
            assert!(!list.is_authorized(ALICE, command));
        }
    }

    #[test]
    fn test_grant_all_covers_every_command() {
        let mut list = Whitelist::new(OWNER);
        assert_eq!(list.grant_all(OWNER, ALICE), Ok(Granted::All));
        for command in CommandName::ALL {
            assert!(list.is_authorized(ALICE, command));
        }
    }

    #[test]
    fn test_single_grant_is_scoped() {
        let mut list = Whitelist::new(OWNER);
        let granted = list
            .grant(OWNER, ALICE, Permission::Command(CommandName::Ban))
            .unwrap();
        assert_eq!(granted, Granted::Command(CommandName::Ban));
        assert!(list.is_authorized(ALICE, CommandName::Ban));
        assert!(!list.is_authorized(ALICE, CommandName::Mute));
    }

    #[test]
    fn test_repeat_grant_is_unchanged() {
        let mut list = Whitelist::new(OWNER);
        list.grant(OWNER, ALICE, Permission::Command(CommandName::Warn))
            .unwrap();
        assert_eq!(
            list.grant(OWNER, ALICE, Permission::Command(CommandName::Warn)),
            Ok(Granted::Unchanged)
        );

        list.grant_all(OWNER, BOB).unwrap();
        assert_eq!(
            list.grant(OWNER, BOB, Permission::Command(CommandName::Nuke)),
            Ok(Granted::Unchanged)
        );
        assert_eq!(list.list(OWNER).unwrap()[1].1, vec![Permission::All]);
    }

    #[test]
    fn test_grant_all_replaces_existing_grants() {
        let mut list = Whitelist::new(OWNER);
        list.grant(OWNER, ALICE, Permission::Command(CommandName::Dm))
            .unwrap();
        list.grant(OWNER, ALICE, Permission::All).unwrap();
        assert_eq!(list.list(OWNER).unwrap(), vec![(ALICE, vec![Permission::All])]);
    }

    #[test]
    fn test_non_owner_cannot_mutate() {
        let mut list = Whitelist::new(OWNER);
        assert_eq!(list.grant_all(ALICE, BOB), Err(WhitelistError::NotOwner));
        assert_eq!(
            list.grant(ALICE, ALICE, Permission::Command(CommandName::Dm)),
            Err(WhitelistError::NotOwner)
        );
        assert_eq!(list.revoke_all(ALICE, BOB), Err(WhitelistError::NotOwner));
        assert_eq!(list.list(ALICE), Err(WhitelistError::NotOwner));
        assert!(!list.is_authorized(BOB, CommandName::Dm));
        assert!(!list.is_authorized(ALICE, CommandName::Dm));
    }

    #[test]
    fn test_revoke_missing_user() {
        let mut list = Whitelist::new(OWNER);
        assert_eq!(
            list.revoke_all(OWNER, ALICE),
            Err(WhitelistError::NotWhitelisted)
        );
        list.grant_all(OWNER, ALICE).unwrap();
        assert_eq!(list.revoke_all(OWNER, ALICE), Ok(()));
        assert!(!list.is_authorized(ALICE, CommandName::Dm));
    }

    #[test]
    fn test_permission_parsing() {
        assert_eq!("ALL".parse::<Permission>(), Ok(Permission::All));
        assert_eq!(
            "Mute".parse::<Permission>(),
            Ok(Permission::Command(CommandName::Mute))
        );
        assert_eq!(
            "kick".parse::<Permission>(),
            Err(WhitelistError::UnknownCommand("kick".to_string()))
        );
    }
}
