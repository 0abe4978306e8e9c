use iced::widget::image::Handle;
use iced::widget::{
    button, checkbox, column, container, horizontal_space, pick_list, row, scrollable, text,
    text_input, Column, Image,
};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use games_catalog::account::AccountService;
use games_catalog::backend::covers::CoverStore;
use games_catalog::backend::identity::LocalIdentity;
use games_catalog::backend::{BlobStore, CatalogStore, IdentityProvider};
use games_catalog::config::Config;
use games_catalog::error::Error;
use games_catalog::logging::init_logging;
use games_catalog::state::catalog::{delete_batch, fetch_all, CatalogController, LoadTicket};
use games_catalog::state::data::{CatalogItem, GameStatus, SortKey, MAX_RATING};
use games_catalog::state::edit::{CoverChange, GameEditor};
use games_catalog::state::library::Library;
use games_catalog::state::validation::PasswordHints;

const RATINGS: [u8; 6] = [0, 1, 2, 3, 4, 5];
const COVER_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff"];

/// Collaborators wired up before the window opens
struct Services {
    config: Config,
    library: Arc<Library>,
    account: AccountService,
    editor: GameEditor,
}

impl Services {
    fn open(config: Config) -> games_catalog::error::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| Error::Config(format!("{}: {}", config.data_dir.display(), e)))?;

        let db_path = config.db_path();
        let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentity::open(&db_path)?);
        let library = Arc::new(Library::open(&db_path, Arc::clone(&identity))?);
        let covers: Arc<dyn BlobStore> = Arc::new(CoverStore::new(
            config.covers_root(),
            config.cover_max_edge,
            Arc::clone(&identity),
        ));
        let store: Arc<dyn CatalogStore> = library.clone();

        let account = AccountService::new(identity, Arc::clone(&store), Arc::clone(&covers))
            .with_min_length(config.password_min_length);
        let editor = GameEditor::new(store, covers);

        Ok(Self {
            config,
            library,
            account,
            editor,
        })
    }
}

/// Status filter choice for the list screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusFilter {
    All,
    Only(GameStatus),
}

impl StatusFilter {
    const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Only(GameStatus::Backlog),
        StatusFilter::Only(GameStatus::Playing),
        StatusFilter::Only(GameStatus::Done),
    ];

    fn from_filter(filter: Option<GameStatus>) -> Self {
        filter.map_or(StatusFilter::All, StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("All"),
            StatusFilter::Only(status) => status.fmt(f),
        }
    }
}

#[derive(Debug, Default)]
struct AuthForm {
    email: String,
    password: String,
    confirmation: String,
    registering: bool,
}

#[derive(Debug, Default)]
struct EditForm {
    item: CatalogItem,
    cover: CoverChange,
    loading: bool,
}

#[derive(Debug, Default)]
struct ProfileForm {
    new_email: String,
    email_password: String,
    current_password: String,
    new_password: String,
    confirmation: String,
    delete_password: String,
}

enum Screen {
    Auth(AuthForm),
    List,
    Edit(EditForm),
    Profile(ProfileForm),
}

/// Main application state
struct GamesCatalog {
    services: Services,
    catalog: CatalogController,
    screen: Screen,
    /// Busy while a write is in flight; blocks double submits
    busy: bool,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    // Sign in / sign up
    EmailChanged(String),
    PasswordChanged(String),
    ConfirmationChanged(String),
    ToggleRegister,
    SubmitAuth,
    ResetPassword,
    AuthDone(Result<(), String>),
    ResetSent(Result<(), String>),

    // Game list
    Loaded(LoadTicket, Result<Vec<CatalogItem>, String>),
    Refresh,
    QueryChanged(String),
    StatusFilterPicked(StatusFilter),
    SortPicked(SortKey),
    ToggleDirection,
    EnterSelection,
    ExitSelection,
    ToggleSelect(String),
    SelectAllVisible,
    DeleteSelected,
    DeletedSelected(Result<usize, String>),
    ImportLegacy,
    Imported(Result<usize, String>),
    NewGame,
    OpenGame(String),
    OpenProfile,
    SignOut,

    // Game form
    GameLoaded(Result<Option<CatalogItem>, String>),
    TitleChanged(String),
    PlatformChanged(String),
    StatusPicked(GameStatus),
    RatingPicked(u8),
    NotesChanged(String),
    PickCover,
    RemoveCover,
    SaveGame,
    Saved(Result<CatalogItem, (Option<String>, String)>),
    DeleteGame,
    GameDeleted(Result<(), String>),

    // Profile
    NewEmailChanged(String),
    EmailPasswordChanged(String),
    CurrentPasswordChanged(String),
    NewPasswordChanged(String),
    NewConfirmationChanged(String),
    DeletePasswordChanged(String),
    SubmitEmail,
    SubmitPassword,
    SubmitDelete,
    ProfileDone(Result<String, String>),
    AccountDeleted(Result<usize, String>),

    Back,
}

impl GamesCatalog {
    fn new(services: Services) -> (Self, Task<Message>) {
        let legacy = services.library.legacy_games().map(|g| g.len()).unwrap_or(0);
        tracing::info!(
            data_dir = %services.config.data_dir.display(),
            legacy,
            "🎮 Games catalog initialized"
        );

        let catalog = CatalogController::new(services.library.clone());
        (
            GamesCatalog {
                services,
                catalog,
                screen: Screen::Auth(AuthForm::default()),
                busy: false,
                status: "Sign in to see your games.".to_string(),
            },
            Task::none(),
        )
    }

    /// Start a catalog fetch. Results of earlier fetches become stale.
    fn reload(&mut self) -> Task<Message> {
        let ticket = self.catalog.begin_load();
        let store = self.catalog.store();
        Task::perform(
            async move { fetch_all(store).await.map_err(|e| e.to_string()) },
            move |result| Message::Loaded(ticket, result),
        )
    }

    /// Drop the signed-out user's games; in-flight loads for them go stale
    fn forget_catalog(&mut self) {
        self.catalog.begin_load();
        let view = self.catalog.view_mut();
        view.clear_selection();
        view.replace_items(Vec::new());
    }

    fn show_list(&mut self) -> Task<Message> {
        self.screen = Screen::List;
        self.reload()
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::EmailChanged(value) => {
                if let Screen::Auth(form) = &mut self.screen {
                    form.email = value;
                }
                Task::none()
            }
            Message::PasswordChanged(value) => {
                if let Screen::Auth(form) = &mut self.screen {
                    form.password = value;
                }
                Task::none()
            }
            Message::ConfirmationChanged(value) => {
                if let Screen::Auth(form) = &mut self.screen {
                    form.confirmation = value;
                }
                Task::none()
            }
            Message::ToggleRegister => {
                if let Screen::Auth(form) = &mut self.screen {
                    form.registering = !form.registering;
                }
                Task::none()
            }
            Message::SubmitAuth => {
                let Screen::Auth(form) = &self.screen else {
                    return Task::none();
                };
                if self.busy {
                    return Task::none();
                }
                self.busy = true;

                let account = self.services.account.clone();
                let (email, password, confirmation, registering) = (
                    form.email.clone(),
                    form.password.clone(),
                    form.confirmation.clone(),
                    form.registering,
                );
                Task::perform(
                    async move {
                        let result = if registering {
                            account.sign_up(&email, &password, &confirmation).await
                        } else {
                            account.sign_in(&email, &password).await
                        };
                        result.map_err(|e| e.to_string())
                    },
                    Message::AuthDone,
                )
            }
            Message::ResetPassword => {
                let Screen::Auth(form) = &self.screen else {
                    return Task::none();
                };
                let account = self.services.account.clone();
                let email = form.email.clone();
                Task::perform(
                    async move { account.send_password_reset(&email).await.map_err(|e| e.to_string()) },
                    Message::ResetSent,
                )
            }
            Message::AuthDone(result) => {
                self.busy = false;
                match result {
                    Ok(()) => {
                        self.status = format!(
                            "Signed in as {}",
                            self.services.account.current_email().unwrap_or_default()
                        );
                        self.show_list()
                    }
                    Err(e) => {
                        self.status = format!("⚠️  {}", e);
                        Task::none()
                    }
                }
            }
            Message::ResetSent(result) => {
                self.status = match result {
                    Ok(()) => "✉️  Password reset requested.".to_string(),
                    Err(e) => format!("⚠️  {}", e),
                };
                Task::none()
            }

            Message::Loaded(ticket, result) => {
                match self.catalog.finish_load(ticket, result.map_err(Error::Fetch)) {
                    Ok(true) => {
                        self.status = format!("{} games", self.catalog.view().items().len());
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Catalog load failed");
                        self.status = format!("⚠️  {}", e);
                    }
                }
                Task::none()
            }
            Message::Refresh => self.reload(),
            Message::QueryChanged(query) => {
                self.catalog.view_mut().set_query(query);
                Task::none()
            }
            Message::StatusFilterPicked(filter) => {
                let status = match filter {
                    StatusFilter::All => None,
                    StatusFilter::Only(status) => Some(status),
                };
                self.catalog.view_mut().set_status_filter(status);
                Task::none()
            }
            Message::SortPicked(key) => {
                self.catalog.view_mut().set_sort_key(key);
                Task::none()
            }
            Message::ToggleDirection => {
                self.catalog.view_mut().toggle_direction();
                Task::none()
            }
            Message::EnterSelection => {
                self.catalog.view_mut().enter_selection_mode();
                Task::none()
            }
            Message::ExitSelection => {
                self.catalog.view_mut().clear_selection();
                Task::none()
            }
            Message::ToggleSelect(id) => {
                self.catalog.view_mut().toggle_select(&id);
                Task::none()
            }
            Message::SelectAllVisible => {
                let visible = self.catalog.view().visible_ids();
                self.catalog.view_mut().select_all_visible(visible);
                Task::none()
            }
            Message::DeleteSelected => {
                if self.busy {
                    return Task::none();
                }
                let targets = self.catalog.selected_targets();
                if targets.is_empty() {
                    return Task::none();
                }
                self.busy = true;
                let store = self.catalog.store();
                Task::perform(
                    async move { delete_batch(store, targets).await.map_err(|e| e.to_string()) },
                    Message::DeletedSelected,
                )
            }
            Message::DeletedSelected(result) => {
                self.busy = false;
                match self.catalog.finish_delete_selected(result.map_err(Error::Write)) {
                    Ok(deleted) => self.status = format!("🗑️  Deleted {} games", deleted),
                    // Selection is kept so the user can retry
                    Err(e) => self.status = format!("⚠️  {}", e),
                }
                // Deletes before a failure have landed too
                self.reload()
            }
            Message::ImportLegacy => {
                if self.busy {
                    return Task::none();
                }
                self.busy = true;
                self.status = "Importing games from the previous version...".to_string();
                let library = self.services.library.clone();
                Task::perform(
                    async move { library.import_legacy().await.map_err(|e| e.to_string()) },
                    Message::Imported,
                )
            }
            Message::Imported(result) => {
                self.busy = false;
                self.status = match result {
                    Ok(count) => format!("✅ Imported {} games", count),
                    Err(e) => format!("⚠️  Import stopped: {}", e),
                };
                self.reload()
            }
            Message::NewGame => {
                self.screen = Screen::Edit(EditForm::default());
                Task::none()
            }
            Message::OpenGame(id) => {
                self.screen = Screen::Edit(EditForm {
                    loading: true,
                    ..EditForm::default()
                });
                let editor = self.services.editor.clone();
                Task::perform(
                    async move { editor.load(&id).await.map_err(|e| e.to_string()) },
                    Message::GameLoaded,
                )
            }
            Message::OpenProfile => {
                self.screen = Screen::Profile(ProfileForm::default());
                Task::none()
            }
            Message::SignOut => {
                self.services.account.sign_out();
                self.forget_catalog();
                self.screen = Screen::Auth(AuthForm::default());
                self.status = "Signed out.".to_string();
                Task::none()
            }

            Message::GameLoaded(result) => {
                // The user may have left the form already
                let Screen::Edit(form) = &mut self.screen else {
                    return Task::none();
                };
                match result {
                    Ok(Some(item)) => {
                        form.item = item;
                        form.loading = false;
                        Task::none()
                    }
                    Ok(None) => {
                        self.status = "That game no longer exists.".to_string();
                        self.show_list()
                    }
                    Err(e) => {
                        self.status = format!("⚠️  {}", e);
                        self.show_list()
                    }
                }
            }
            Message::TitleChanged(value) => {
                if let Screen::Edit(form) = &mut self.screen {
                    form.item.title = value;
                }
                Task::none()
            }
            Message::PlatformChanged(value) => {
                if let Screen::Edit(form) = &mut self.screen {
                    form.item.platform = value;
                }
                Task::none()
            }
            Message::StatusPicked(status) => {
                if let Screen::Edit(form) = &mut self.screen {
                    form.item.status = status;
                }
                Task::none()
            }
            Message::RatingPicked(rating) => {
                if let Screen::Edit(form) = &mut self.screen {
                    form.item.rating = rating.min(MAX_RATING);
                }
                Task::none()
            }
            Message::NotesChanged(value) => {
                if let Screen::Edit(form) = &mut self.screen {
                    form.item.notes = value;
                }
                Task::none()
            }
            Message::PickCover => {
                let Screen::Edit(form) = &mut self.screen else {
                    return Task::none();
                };
                // Show the native file picker dialog
                let picked = FileDialog::new()
                    .set_title("Select Cover Image")
                    .add_filter("Images", &COVER_EXTENSIONS)
                    .pick_file();
                if let Some(path) = picked {
                    form.cover = CoverChange::Replace(path);
                }
                Task::none()
            }
            Message::RemoveCover => {
                if let Screen::Edit(form) = &mut self.screen {
                    form.cover = CoverChange::Remove;
                }
                Task::none()
            }
            Message::SaveGame => {
                let Screen::Edit(form) = &self.screen else {
                    return Task::none();
                };
                if self.busy || form.loading {
                    return Task::none();
                }
                if let Err(e) = form.item.validate() {
                    self.status = format!("⚠️  {}", e);
                    return Task::none();
                }
                self.busy = true;
                self.status = "Saving...".to_string();

                let editor = self.services.editor.clone();
                let (item, cover) = (form.item.clone(), form.cover.clone());
                Task::perform(
                    async move {
                        editor
                            .save(item, cover)
                            .await
                            .map_err(|e| (e.item_id.clone(), e.to_string()))
                    },
                    Message::Saved,
                )
            }
            Message::Saved(result) => {
                self.busy = false;
                match result {
                    Ok(item) => {
                        self.status = format!("✅ Saved {}", item.title);
                        self.show_list()
                    }
                    Err((item_id, e)) => {
                        // Keep the assigned id so a retry updates instead of duplicating
                        if let (Screen::Edit(form), Some(id)) = (&mut self.screen, item_id) {
                            form.item.id = Some(id);
                        }
                        self.status = format!("⚠️  {}", e);
                        Task::none()
                    }
                }
            }
            Message::DeleteGame => {
                let Screen::Edit(form) = &self.screen else {
                    return Task::none();
                };
                if self.busy {
                    return Task::none();
                }
                if form.item.id.is_none() {
                    return self.show_list();
                }
                self.busy = true;
                let editor = self.services.editor.clone();
                let item = form.item.clone();
                Task::perform(
                    async move { editor.discard(&item).await.map_err(|e| e.to_string()) },
                    Message::GameDeleted,
                )
            }
            Message::GameDeleted(result) => {
                self.busy = false;
                match result {
                    Ok(()) => {
                        self.status = "🗑️  Game deleted".to_string();
                        self.show_list()
                    }
                    Err(e) => {
                        self.status = format!("⚠️  {}", e);
                        Task::none()
                    }
                }
            }

            Message::NewEmailChanged(value) => {
                if let Screen::Profile(form) = &mut self.screen {
                    form.new_email = value;
                }
                Task::none()
            }
            Message::EmailPasswordChanged(value) => {
                if let Screen::Profile(form) = &mut self.screen {
                    form.email_password = value;
                }
                Task::none()
            }
            Message::CurrentPasswordChanged(value) => {
                if let Screen::Profile(form) = &mut self.screen {
                    form.current_password = value;
                }
                Task::none()
            }
            Message::NewPasswordChanged(value) => {
                if let Screen::Profile(form) = &mut self.screen {
                    form.new_password = value;
                }
                Task::none()
            }
            Message::NewConfirmationChanged(value) => {
                if let Screen::Profile(form) = &mut self.screen {
                    form.confirmation = value;
                }
                Task::none()
            }
            Message::DeletePasswordChanged(value) => {
                if let Screen::Profile(form) = &mut self.screen {
                    form.delete_password = value;
                }
                Task::none()
            }
            Message::SubmitEmail => {
                let Screen::Profile(form) = &self.screen else {
                    return Task::none();
                };
                if self.busy {
                    return Task::none();
                }
                self.busy = true;
                self.status = "Updating email...".to_string();
                let account = self.services.account.clone();
                let (email, password) = (form.new_email.clone(), form.email_password.clone());
                Task::perform(
                    async move {
                        account
                            .change_email(&email, &password)
                            .await
                            .map(|()| "📧 Email changed".to_string())
                            .map_err(|e| e.to_string())
                    },
                    Message::ProfileDone,
                )
            }
            Message::SubmitPassword => {
                let Screen::Profile(form) = &self.screen else {
                    return Task::none();
                };
                if self.busy {
                    return Task::none();
                }
                self.busy = true;
                self.status = "Updating password...".to_string();
                let account = self.services.account.clone();
                let (current, new, confirmation) = (
                    form.current_password.clone(),
                    form.new_password.clone(),
                    form.confirmation.clone(),
                );
                Task::perform(
                    async move {
                        account
                            .change_password(&current, &new, &confirmation)
                            .await
                            .map(|()| "🔑 Password changed".to_string())
                            .map_err(|e| e.to_string())
                    },
                    Message::ProfileDone,
                )
            }
            Message::SubmitDelete => {
                let Screen::Profile(form) = &self.screen else {
                    return Task::none();
                };
                if self.busy {
                    return Task::none();
                }
                self.busy = true;
                let account = self.services.account.clone();
                let password = form.delete_password.clone();
                Task::perform(
                    async move { account.delete_account(&password).await.map_err(|e| e.to_string()) },
                    Message::AccountDeleted,
                )
            }
            Message::ProfileDone(result) => {
                self.busy = false;
                self.status = match result {
                    Ok(done) => {
                        if let Screen::Profile(form) = &mut self.screen {
                            *form = ProfileForm::default();
                        }
                        done
                    }
                    // Keep what was typed so it can be corrected
                    Err(e) => format!("⚠️  {}", e),
                };
                Task::none()
            }
            Message::AccountDeleted(result) => {
                self.busy = false;
                match result {
                    Ok(removed) => {
                        self.forget_catalog();
                        self.screen = Screen::Auth(AuthForm::default());
                        self.status = format!("👋 Account deleted along with {} games", removed);
                    }
                    Err(e) => self.status = format!("⚠️  {}", e),
                }
                Task::none()
            }

            Message::Back => self.show_list(),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let body: Element<Message> = match &self.screen {
            Screen::Auth(form) => self.auth_view(form),
            Screen::List => self.list_view(),
            Screen::Edit(form) => self.edit_view(form),
            Screen::Profile(form) => self.profile_view(form),
        };

        let content = column![body, text(&self.status).size(14)]
            .spacing(20)
            .padding(30);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn auth_view(&self, form: &AuthForm) -> Element<Message> {
        let min_length = self.services.account.min_length();
        let mut fields: Column<Message> = column![
            text(if form.registering { "Create account" } else { "Sign in" }).size(36),
            text_input("Email", &form.email).on_input(Message::EmailChanged),
            text_input("Password", &form.password)
                .secure(true)
                .on_input(Message::PasswordChanged)
                .on_submit(Message::SubmitAuth),
        ]
        .spacing(12)
        .max_width(420);

        if form.registering {
            let hints = PasswordHints::of(&form.password, min_length);
            fields = fields
                .push(
                    text_input("Confirm password", &form.confirmation)
                        .secure(true)
                        .on_input(Message::ConfirmationChanged)
                        .on_submit(Message::SubmitAuth),
                )
                .push(text(hint_line(&hints, min_length)).size(12));
        }

        let submit = button(if form.registering { "Sign up" } else { "Sign in" })
            .on_press_maybe((!self.busy).then_some(Message::SubmitAuth))
            .padding(10);
        let switch = button(if form.registering {
            "I already have an account"
        } else {
            "Create an account"
        })
        .on_press(Message::ToggleRegister)
        .style(button::text);
        let reset = button("Forgot password?")
            .on_press(Message::ResetPassword)
            .style(button::text);

        container(fields.push(row![submit, switch, reset].spacing(10)))
            .center_x(Length::Fill)
            .into()
    }

    fn list_view(&self) -> Element<Message> {
        let view = self.catalog.view();

        let filters = row![
            text_input("Search titles", &view.query).on_input(Message::QueryChanged),
            pick_list(
                &StatusFilter::ALL[..],
                Some(StatusFilter::from_filter(view.status_filter)),
                Message::StatusFilterPicked
            ),
            pick_list(&SortKey::ALL[..], Some(view.sort_key), Message::SortPicked),
            button(if view.ascending { "▲" } else { "▼" }).on_press(Message::ToggleDirection),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let actions = (if view.selection_mode() {
            row![
                text(format!("{} selected", view.selected().len())),
                horizontal_space(),
                button("Select all").on_press(Message::SelectAllVisible),
                button("Delete selected")
                    .on_press_maybe((!self.busy).then_some(Message::DeleteSelected))
                    .style(button::danger),
                button("Done").on_press(Message::ExitSelection),
            ]
        } else {
            row![
                button("New game").on_press(Message::NewGame),
                button("Select").on_press(Message::EnterSelection),
                button("Refresh").on_press(Message::Refresh),
                button("Import previous version")
                    .on_press_maybe((!self.busy).then_some(Message::ImportLegacy)),
                horizontal_space(),
                button("Profile").on_press(Message::OpenProfile),
                button("Sign out").on_press(Message::SignOut),
            ]
        })
        .spacing(10)
        .align_y(Alignment::Center);

        let rows = view.visible().into_iter().filter_map(|item| {
            let id = item.id.clone()?;
            let label = text(format!(
                "{}  ·  {}  ·  {}  ·  {}",
                item.title,
                item.platform,
                item.status,
                stars(item.rating)
            ));
            let line: Element<Message> = if view.selection_mode() {
                let selected = view.is_selected(&id);
                row![
                    checkbox("", selected).on_toggle(move |_| Message::ToggleSelect(id.clone())),
                    label
                ]
                .spacing(10)
                .align_y(Alignment::Center)
                .into()
            } else {
                button(label)
                    .on_press(Message::OpenGame(id))
                    .style(button::text)
                    .width(Length::Fill)
                    .into()
            };
            Some(line)
        });

        column![
            text("My games").size(36),
            filters,
            actions,
            scrollable(Column::with_children(rows).spacing(4)).height(Length::Fill),
        ]
        .spacing(16)
        .into()
    }

    fn edit_view(&self, form: &EditForm) -> Element<Message> {
        if form.loading {
            return text("Loading...").into();
        }
        let item = &form.item;

        let cover: Element<Message> = match (&form.cover, cover_path(&item.cover_url)) {
            (CoverChange::Replace(path), _) => cover_image(path.clone()),
            (CoverChange::Keep, Some(path)) => cover_image(path),
            (CoverChange::Remove, _) | (CoverChange::Keep, None) => text("No cover").into(),
        };

        let fields = column![
            text_input("Title", &item.title).on_input(Message::TitleChanged),
            text_input("Platform", &item.platform).on_input(Message::PlatformChanged),
            row![
                text("Status"),
                pick_list(&GameStatus::ALL[..], Some(item.status), Message::StatusPicked),
                text("Rating"),
                pick_list(&RATINGS[..], Some(item.rating), Message::RatingPicked),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            text_input("Notes", &item.notes).on_input(Message::NotesChanged),
            row![
                button("Choose cover...").on_press(Message::PickCover),
                button("Remove cover").on_press(Message::RemoveCover),
            ]
            .spacing(10),
        ]
        .spacing(12)
        .width(Length::Fill);

        let mut actions = row![
            button("Save")
                .on_press_maybe((!self.busy).then_some(Message::SaveGame))
                .padding(10),
            button("Cancel").on_press(Message::Back).padding(10),
        ]
        .spacing(10);
        if item.id.is_some() {
            actions = actions.push(
                button("Delete")
                    .on_press_maybe((!self.busy).then_some(Message::DeleteGame))
                    .style(button::danger)
                    .padding(10),
            );
        }

        column![
            text(if item.id.is_some() { "Edit game" } else { "New game" }).size(36),
            row![cover, fields].spacing(20),
            actions,
        ]
        .spacing(16)
        .into()
    }

    fn profile_view(&self, form: &ProfileForm) -> Element<Message> {
        let min_length = self.services.account.min_length();
        let hints = PasswordHints::of(&form.new_password, min_length);
        let email = self.services.account.current_email().unwrap_or_default();

        column![
            text("Profile").size(36),
            text(format!("Signed in as {}", email)),
            text("Change email").size(20),
            text_input("New email", &form.new_email).on_input(Message::NewEmailChanged),
            text_input("Current password", &form.email_password)
                .secure(true)
                .on_input(Message::EmailPasswordChanged),
            button("Update email").on_press(Message::SubmitEmail),
            text("Change password").size(20),
            text_input("Current password", &form.current_password)
                .secure(true)
                .on_input(Message::CurrentPasswordChanged),
            text_input("New password", &form.new_password)
                .secure(true)
                .on_input(Message::NewPasswordChanged),
            text_input("Confirm new password", &form.confirmation)
                .secure(true)
                .on_input(Message::NewConfirmationChanged),
            text(hint_line(&hints, min_length)).size(12),
            button("Update password").on_press(Message::SubmitPassword),
            text("Delete account").size(20),
            text_input("Password", &form.delete_password)
                .secure(true)
                .on_input(Message::DeletePasswordChanged),
            button("Delete my account and all games")
                .on_press_maybe((!self.busy).then_some(Message::SubmitDelete))
                .style(button::danger),
            button("Back").on_press(Message::Back),
        ]
        .spacing(10)
        .max_width(480)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn stars(rating: u8) -> String {
    let filled = rating.min(MAX_RATING) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(MAX_RATING as usize - filled))
}

fn hint_line(hints: &PasswordHints, min_length: usize) -> String {
    let mark = |ok: bool| if ok { "✓" } else { "·" };
    format!(
        "{} {}+ chars  {} upper  {} lower  {} digit  {} symbol",
        mark(hints.min_length),
        min_length,
        mark(hints.upper_case),
        mark(hints.lower_case),
        mark(hints.digit),
        mark(hints.special),
    )
}

/// Local file behind a stored cover URL
fn cover_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://").map(PathBuf::from)
}

fn cover_image<'a>(path: PathBuf) -> Element<'a, Message> {
    Image::new(Handle::from_path(path))
        .width(Length::Fixed(160.0))
        .into()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(error = %e, "Could not read configuration");
            return Err(e.into());
        }
    };
    init_logging(&config.log_filter);

    let services = Services::open(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to open catalog storage. Check permissions and disk space.");
        e
    })?;

    iced::application("Games Catalog", GamesCatalog::update, GamesCatalog::view)
        .theme(GamesCatalog::theme)
        .centered()
        .run_with(move || GamesCatalog::new(services))?;
    Ok(())
}
