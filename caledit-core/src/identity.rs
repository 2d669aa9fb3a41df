//! Who the current user is, relative to a component and a calendar.

use crate::component::{CalendarComponent, addresses_equal};
use crate::store::{Capability, ComponentStore};

/// The user's configured addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    addresses: Vec<String>,
}

impl Identity {
    pub fn new(addresses: Vec<String>) -> Self {
        Identity { addresses }
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn is_user_address(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| addresses_equal(a, address))
    }

    fn is_user_on(&self, store: &dyn ComponentStore, address: &str) -> bool {
        store
            .cal_email_address()
            .is_some_and(|cal| addresses_equal(&cal, address))
            || self.is_user_address(address)
    }

    /// Whether the user organizes `comp` on `store`.
    pub fn organizer_is_user(&self, store: &dyn ComponentStore, comp: &CalendarComponent) -> bool {
        if store.check_capability(Capability::NoOrganizer) {
            return false;
        }
        let Some(ref organizer) = comp.organizer else {
            return false;
        };

        if store
            .cal_email_address()
            .is_some_and(|cal| addresses_equal(&cal, &organizer.email))
        {
            return true;
        }
        if store.check_capability(Capability::OrganizerNotEmailAddress) {
            return false;
        }
        self.is_user_address(&organizer.email)
    }

    /// Whether the user acts for the organizer (ORGANIZER;SENT-BY=).
    pub fn sentby_is_user(&self, store: &dyn ComponentStore, comp: &CalendarComponent) -> bool {
        if store.check_capability(Capability::NoOrganizer) {
            return false;
        }
        comp.organizer
            .as_ref()
            .and_then(|org| org.sent_by.as_deref())
            .is_some_and(|sent_by| self.is_user_on(store, sent_by))
    }

    /// The address under which the user takes part in `comp`.
    ///
    /// An attendee matching the calendar address (directly or through
    /// SENT-BY) wins, then one matching a configured address. Without a
    /// match, the calendar address or the first configured address is used.
    pub fn comp_attendee(
        &self,
        store: &dyn ComponentStore,
        comp: &CalendarComponent,
    ) -> Option<String> {
        let cal_address = store.cal_email_address();
        if let Some(ref cal) = cal_address {
            if let Some(found) = find_attendee(comp, |email| addresses_equal(cal, email)) {
                return Some(found);
            }
        }
        if let Some(found) = find_attendee(comp, |email| self.is_user_address(email)) {
            return Some(found);
        }

        cal_address.or_else(|| self.addresses.first().cloned())
    }
}

/// First attendee whose address, or SENT-BY address, satisfies `candidate`
fn find_attendee(comp: &CalendarComponent, candidate: impl Fn(&str) -> bool) -> Option<String> {
    comp.attendees
        .iter()
        .find(|attendee| {
            candidate(&attendee.email) || attendee.sent_by.as_deref().is_some_and(&candidate)
        })
        .map(|attendee| attendee.email.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Attendee, ComponentKind, Organizer};
    use crate::store::MemoryStore;

    fn organized_by(email: &str, sent_by: Option<&str>) -> CalendarComponent {
        let mut comp = CalendarComponent::new(ComponentKind::Event);
        comp.organizer = Some(Organizer {
            email: email.to_string(),
            name: None,
            sent_by: sent_by.map(str::to_string),
        });
        comp
    }

    #[test]
    fn organizer_matches_calendar_or_identity_address() {
        let identity = Identity::new(vec!["me@example.com".to_string()]);
        let store = MemoryStore::new("work", "Work").with_cal_email("work@example.com");

        assert!(identity.organizer_is_user(&store, &organized_by("MAILTO:work@example.com", None)));
        assert!(identity.organizer_is_user(&store, &organized_by("me@example.com", None)));
        assert!(!identity.organizer_is_user(&store, &organized_by("boss@example.com", None)));
    }

    #[test]
    fn organizer_capabilities_restrict_matching() {
        let identity = Identity::new(vec!["me@example.com".to_string()]);
        let comp = organized_by("me@example.com", None);

        let no_org = MemoryStore::new("a", "A").with_capability(Capability::NoOrganizer);
        assert!(!identity.organizer_is_user(&no_org, &comp));

        let not_email =
            MemoryStore::new("b", "B").with_capability(Capability::OrganizerNotEmailAddress);
        assert!(!identity.organizer_is_user(&not_email, &comp));
    }

    #[test]
    fn sentby_matches_user() {
        let identity = Identity::new(vec!["assistant@example.com".to_string()]);
        let store = MemoryStore::new("work", "Work");
        let comp = organized_by("boss@example.com", Some("assistant@example.com"));

        assert!(!identity.organizer_is_user(&store, &comp));
        assert!(identity.sentby_is_user(&store, &comp));
    }

    #[test]
    fn comp_attendee_prefers_calendar_address_then_sent_by() {
        let identity = Identity::new(vec!["me@example.com".to_string()]);
        let store = MemoryStore::new("work", "Work").with_cal_email("desk@example.com");
        let mut comp = organized_by("boss@example.com", None);
        let mut delegate = Attendee::new("team@example.com");
        delegate.sent_by = Some("desk@example.com".to_string());
        comp.attendees = vec![Attendee::new("me@example.com"), delegate];

        assert_eq!(
            identity.comp_attendee(&store, &comp).as_deref(),
            Some("team@example.com")
        );

        let plain = MemoryStore::new("home", "Home");
        assert_eq!(
            identity.comp_attendee(&plain, &comp).as_deref(),
            Some("me@example.com")
        );

        comp.attendees.clear();
        assert_eq!(
            identity.comp_attendee(&plain, &comp).as_deref(),
            Some("me@example.com")
        );
    }
}
