/// All possible semantic actions in Despacho.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Navigation
    FocusPrevColumn,
    FocusNextColumn,
    SelectPrevCard,
    SelectNextCard,

    // Card movement (Kanban)
    MoveCardPrevColumn,
    MoveCardNextColumn,
    MoveToColumn,

    // Request actions
    NewRequest,
    EditRequest,
    MarkUrgent,
    CancelRequest,
    ShowLinks,

    // Views & filters
    ToggleView,
    StartSearch,
    PickStatusFilter,
    PickPriorityFilter,
    PickWaitFilter,
    ClearFilters,

    // Column mode
    EnterColumnMode,
    ColAdd,
    ColRename,
    ColDelete,
    ColPickColor,
    ColMoveLeft,
    ColMoveRight,

    // Session & board
    Logout,
    ShowHelp,
    ClosePanel,
    Quit,

    // Input modal / search / login
    InputConfirm,
    InputCancel,
    InputChar(char),
    InputBackspace,
    InputLeft,
    InputRight,
    InputHome,
    InputEnd,
    InputDeleteWord,

    // Request form
    FormNextField,
    FormPrevField,
    FormSubmit,
    FormLookupCep,

    // Confirmation
    Confirm,
    Deny,

    // Notice modal
    DismissNotice,

    // No-op
    None,
}
