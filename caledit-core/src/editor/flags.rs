/// How an editor was opened, and the user's role in the component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorFlags {
    /// The component has never been saved
    pub new_item: bool,
    /// The component has (or may get) attendees
    pub meeting: bool,
    /// The editor was opened to delegate the component to someone else
    pub delegate: bool,
    /// The user organizes the component
    pub user_org: bool,
    /// A task assigned to other people
    pub is_assigned: bool,
}
