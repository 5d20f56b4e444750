//! Accessibility roles. The camelCase tag is the in-process spelling, the
//! CONSTANT_CASE form (derived, never hand-written) is the wire spelling.

tag_table! {
    /// Accessibility role of a node.
    Role {
        Abbr => "abbr",
        Alert => "alert",
        AlertDialog => "alertDialog",
        Application => "application",
        Article => "article",
        Audio => "audio",
        Banner => "banner",
        Blockquote => "blockquote",
        Button => "button",
        Canvas => "canvas",
        Caption => "caption",
        Caret => "caret",
        Cell => "cell",
        CheckBox => "checkBox",
        Client => "client",
        Code => "code",
        ColorWell => "colorWell",
        Column => "column",
        ColumnHeader => "columnHeader",
        ComboBoxGrouping => "comboBoxGrouping",
        ComboBoxMenuButton => "comboBoxMenuButton",
        ComboBoxSelect => "comboBoxSelect",
        Comment => "comment",
        Complementary => "complementary",
        ContentDeletion => "contentDeletion",
        ContentInsertion => "contentInsertion",
        ContentInfo => "contentInfo",
        Date => "date",
        DateTime => "dateTime",
        Definition => "definition",
        DescriptionList => "descriptionList",
        DescriptionListDetail => "descriptionListDetail",
        DescriptionListTerm => "descriptionListTerm",
        Desktop => "desktop",
        Details => "details",
        Dialog => "dialog",
        Directory => "directory",
        DisclosureTriangle => "disclosureTriangle",
        DocAbstract => "docAbstract",
        DocAcknowledgments => "docAcknowledgments",
        DocAfterword => "docAfterword",
        DocAppendix => "docAppendix",
        DocBackLink => "docBackLink",
        DocBiblioEntry => "docBiblioEntry",
        DocBibliography => "docBibliography",
        DocBiblioRef => "docBiblioRef",
        DocChapter => "docChapter",
        DocColophon => "docColophon",
        DocConclusion => "docConclusion",
        DocCover => "docCover",
        DocCredit => "docCredit",
        DocCredits => "docCredits",
        DocDedication => "docDedication",
        DocEndnote => "docEndnote",
        DocEndnotes => "docEndnotes",
        DocEpigraph => "docEpigraph",
        DocEpilogue => "docEpilogue",
        DocErrata => "docErrata",
        DocExample => "docExample",
        DocFootnote => "docFootnote",
        DocForeword => "docForeword",
        DocGlossary => "docGlossary",
        DocGlossRef => "docGlossRef",
        DocIndex => "docIndex",
        DocIntroduction => "docIntroduction",
        DocNoteRef => "docNoteRef",
        DocNotice => "docNotice",
        DocPageBreak => "docPageBreak",
        DocPageFooter => "docPageFooter",
        DocPageHeader => "docPageHeader",
        DocPageList => "docPageList",
        DocPart => "docPart",
        DocPreface => "docPreface",
        DocPrologue => "docPrologue",
        DocPullquote => "docPullquote",
        DocQna => "docQna",
        DocSubtitle => "docSubtitle",
        DocTip => "docTip",
        DocToc => "docToc",
        Document => "document",
        EmbeddedObject => "embeddedObject",
        Emphasis => "emphasis",
        Feed => "feed",
        Figcaption => "figcaption",
        Figure => "figure",
        Footer => "footer",
        FooterAsNonLandmark => "footerAsNonLandmark",
        Form => "form",
        GenericContainer => "genericContainer",
        GraphicsDocument => "graphicsDocument",
        GraphicsObject => "graphicsObject",
        GraphicsSymbol => "graphicsSymbol",
        Grid => "grid",
        Group => "group",
        Header => "header",
        HeaderAsNonLandmark => "headerAsNonLandmark",
        Heading => "heading",
        Iframe => "iframe",
        IframePresentational => "iframePresentational",
        Image => "image",
        ImeCandidate => "imeCandidate",
        InlineTextBox => "inlineTextBox",
        InputTime => "inputTime",
        Keyboard => "keyboard",
        LabelText => "labelText",
        LayoutTable => "layoutTable",
        LayoutTableCell => "layoutTableCell",
        LayoutTableRow => "layoutTableRow",
        Legend => "legend",
        LineBreak => "lineBreak",
        Link => "link",
        List => "list",
        ListBox => "listBox",
        ListBoxOption => "listBoxOption",
        ListGrid => "listGrid",
        ListItem => "listItem",
        ListMarker => "listMarker",
        Log => "log",
        Main => "main",
        Mark => "mark",
        Marquee => "marquee",
        Math => "math",
        Menu => "menu",
        MenuBar => "menuBar",
        MenuItem => "menuItem",
        MenuItemCheckBox => "menuItemCheckBox",
        MenuItemRadio => "menuItemRadio",
        MenuListOption => "menuListOption",
        MenuListPopup => "menuListPopup",
        Meter => "meter",
        Navigation => "navigation",
        Note => "note",
        Pane => "pane",
        Paragraph => "paragraph",
        PdfActionableHighlight => "pdfActionableHighlight",
        PdfRoot => "pdfRoot",
        PluginObject => "pluginObject",
        PopUpButton => "popUpButton",
        Portal => "portal",
        Pre => "pre",
        ProgressIndicator => "progressIndicator",
        RadioButton => "radioButton",
        RadioGroup => "radioGroup",
        Region => "region",
        RootWebArea => "rootWebArea",
        Row => "row",
        RowGroup => "rowGroup",
        RowHeader => "rowHeader",
        Ruby => "ruby",
        RubyAnnotation => "rubyAnnotation",
        ScrollBar => "scrollBar",
        ScrollView => "scrollView",
        Search => "search",
        SearchBox => "searchBox",
        Section => "section",
        Slider => "slider",
        SpinButton => "spinButton",
        Splitter => "splitter",
        StaticText => "staticText",
        Status => "status",
        Strong => "strong",
        Suggestion => "suggestion",
        SvgRoot => "svgRoot",
        Switch => "switch",
        Tab => "tab",
        TabList => "tabList",
        TabPanel => "tabPanel",
        Table => "table",
        TableHeaderContainer => "tableHeaderContainer",
        Term => "term",
        TextField => "textField",
        TextFieldWithComboBox => "textFieldWithComboBox",
        Time => "time",
        Timer => "timer",
        TitleBar => "titleBar",
        ToggleButton => "toggleButton",
        Toolbar => "toolbar",
        Tooltip => "tooltip",
        Tree => "tree",
        TreeGrid => "treeGrid",
        TreeItem => "treeItem",
        Unknown => "unknown",
        Video => "video",
        WebView => "webView",
        Window => "window",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wire_spelling_is_bijective() {
        let mut seen = HashSet::new();
        for role in Role::ALL {
            let wire = role.to_wire();
            assert!(seen.insert(wire.clone()), "duplicate wire spelling {}", wire);
            assert_eq!(Role::from_wire(&wire), Some(*role), "{} did not round-trip", wire);
            assert_eq!(Role::from_tag(role.as_str()), Some(*role));
        }
    }

    #[test]
    fn test_known_spellings() {
        assert_eq!(Role::ComboBoxMenuButton.to_wire(), "COMBO_BOX_MENU_BUTTON");
        assert_eq!(Role::from_wire("ALERT_DIALOG"), Some(Role::AlertDialog));
        assert_eq!(Role::from_wire("ABBR"), Some(Role::Abbr));
        assert_eq!(Role::RootWebArea.as_str(), "rootWebArea");
    }

    #[test]
    fn test_wire_rejects_non_canonical_spelling() {
        assert_eq!(Role::from_wire("alertDialog"), None);
        assert_eq!(Role::from_wire("ALERTDIALOG"), None);
        assert_eq!(Role::from_wire("NOT_A_ROLE"), None);
    }

    #[test]
    fn test_serde_uses_camel_case_tag() {
        let json = serde_json::to_string(&Role::TabList).unwrap();
        assert_eq!(json, "\"tabList\"");
        let back: Role = serde_json::from_str("\"menuItem\"").unwrap();
        assert_eq!(back, Role::MenuItem);
        assert!(serde_json::from_str::<Role>("\"MENU_ITEM\"").is_err());
    }
}
