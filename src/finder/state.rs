//! Node state flags and the boolean shorthand atoms built on top of them.

tag_table! {
    /// A boolean state a node may carry.
    StateKind {
        AutofillAvailable => "autofillAvailable",
        Collapsed => "collapsed",
        Default => "default",
        Editable => "editable",
        Expanded => "expanded",
        Focusable => "focusable",
        Focused => "focused",
        Horizontal => "horizontal",
        Hovered => "hovered",
        Ignored => "ignored",
        Invisible => "invisible",
        Linked => "linked",
        Multiline => "multiline",
        Multiselectable => "multiselectable",
        Offscreen => "offscreen",
        Protected => "protected",
        Required => "required",
        RichlyEditable => "richlyEditable",
        Vertical => "vertical",
        Visited => "visited",
    }
}

tag_table! {
    /// Shorthand atoms, each equivalent to one `State(kind, value)` filter.
    Flag {
        AutofillAvailable => "autofillAvailable",
        Collapsed => "collapsed",
        Default => "default",
        Editable => "editable",
        Expanded => "expanded",
        Focusable => "focusable",
        Focused => "focused",
        Horizontal => "horizontal",
        Hovered => "hovered",
        Ignored => "ignored",
        Invisible => "invisible",
        Linked => "linked",
        Multiline => "multiline",
        Multiselectable => "multiselectable",
        Offscreen => "offscreen",
        Onscreen => "onscreen",
        Protected => "protected",
        Required => "required",
        RichlyEditable => "richlyEditable",
        Vertical => "vertical",
        Visible => "visible",
        Visited => "visited",
    }
}

impl Flag {
    /// The state filter this flag stands for.
    pub fn state(self) -> (StateKind, bool) {
        match self {
            Flag::AutofillAvailable => (StateKind::AutofillAvailable, true),
            Flag::Collapsed => (StateKind::Collapsed, true),
            Flag::Default => (StateKind::Default, true),
            Flag::Editable => (StateKind::Editable, true),
            Flag::Expanded => (StateKind::Expanded, true),
            Flag::Focusable => (StateKind::Focusable, true),
            Flag::Focused => (StateKind::Focused, true),
            Flag::Horizontal => (StateKind::Horizontal, true),
            Flag::Hovered => (StateKind::Hovered, true),
            Flag::Ignored => (StateKind::Ignored, true),
            Flag::Invisible => (StateKind::Invisible, true),
            Flag::Linked => (StateKind::Linked, true),
            Flag::Multiline => (StateKind::Multiline, true),
            Flag::Multiselectable => (StateKind::Multiselectable, true),
            Flag::Offscreen => (StateKind::Offscreen, true),
            Flag::Onscreen => (StateKind::Offscreen, false),
            Flag::Protected => (StateKind::Protected, true),
            Flag::Required => (StateKind::Required, true),
            Flag::RichlyEditable => (StateKind::RichlyEditable, true),
            Flag::Vertical => (StateKind::Vertical, true),
            Flag::Visible => (StateKind::Invisible, false),
            Flag::Visited => (StateKind::Visited, true),
        }
    }
}
