use anyhow::Result;
use myflix::app::App;
use myflix::auth::{LoginForm, RegistrationForm, SubmitOutcome};
use myflix::catalog::Catalog;
use myflix::models::{Movie, MovieRef};
use myflix::router::Route;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub struct Context {
    pub app: App,
}

pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    handle_line(ctx, line)?;
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("myflix - type help for commands, exit to quit");
    show_session(&ctx);

    loop {
        let prompt = format!("myflix:{}> ", ctx.app.router.current());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                match handle_line(&ctx, line) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => eprintln!("Error: {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Returns true when the shell should exit
fn handle_line(ctx: &Context, line: &str) -> Result<bool> {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            println!("Could not parse command: {}", e);
            return Ok(false);
        }
    };
    let Some((command, rest)) = words.split_first() else {
        return Ok(false);
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let app = &ctx.app;

    match command.as_str() {
        "exit" | "quit" => return Ok(true),
        "help" => print_help(),
        "go" => {
            let route = app.router.navigate(rest.first().copied().unwrap_or(""));
            show_route(ctx, route);
        }
        "whoami" => show_session(ctx),
        "register" => handle_register(ctx, &rest),
        "login" => handle_login(ctx, &rest),
        "logout" => app.logout()?,
        "movies" => {
            app.router.navigate("movies");
            show_movies(ctx);
        }
        "list" => show_movies(ctx),
        "genre" | "director" | "details" | "fav" => match rest.first() {
            Some(key) => handle_movie_action(ctx, command, &rest.join(" "), key),
            None => println!("Usage: {} <number|title>", command),
        },
        "lookup" => handle_lookup(ctx, &rest),
        "profile" => {
            app.router.navigate("profile");
            show_profile(ctx);
        }
        "set" => handle_set(ctx, &rest),
        "save" => {
            app.profile.save();
        }
        "unfav" => match rest.first() {
            Some(_) => {
                let key = rest.join(" ");
                match app.profile.find_favorite(&key) {
                    Some(entry) => {
                        app.profile.remove_favorite(entry.id());
                    }
                    None => println!("No favorite matches '{}'. Use profile to list them.", key),
                }
            }
            None => println!("Usage: unfav <number|id>"),
        },
        "delete-account" => {
            if rest.first() == Some(&"--yes") {
                app.delete_account();
            } else {
                println!("This permanently deletes your account. Run 'delete-account --yes' to confirm.");
            }
        }
        other => println!("Unknown command: {} (try help)", other),
    }
    Ok(false)
}

fn print_help() {
    println!("Navigation:");
    println!("  go <welcome|movies|profile>       - switch view");
    println!("  whoami                            - show session");
    println!("  exit                              - quit");
    println!("Account:");
    println!("  register <user> <password> <email> [YYYY-MM-DD]");
    println!("  login <user> <password>");
    println!("  logout");
    println!("Movies:");
    println!("  movies                            - load and list the catalog");
    println!("  list                              - list without reloading");
    println!("  genre|director|details <n>        - show a movie's genre, director or full record");
    println!("  fav <n>                           - toggle favorite");
    println!("  lookup movie|genre|director <name> - fetch detail from the API");
    println!("Profile:");
    println!("  profile                           - load and show your profile");
    println!("  set email|birthday|password <v>   - edit a field");
    println!("  save                              - submit profile changes");
    println!("  unfav <n>                         - remove a favorite");
    println!("  delete-account --yes              - delete your account");
    println!("<n> is a list number, an id, or an exact title.");
}

fn show_session(ctx: &Context) {
    let session = ctx.app.session.current();
    match session.active_user() {
        Some(user) => println!("Logged in as {}", user),
        None => println!("Not logged in"),
    }
}

fn show_route(ctx: &Context, route: Route) {
    match route {
        Route::Welcome => {
            println!("Welcome to myFlix. Use register or login to get started.");
        }
        Route::Movies => show_movies(ctx),
        Route::Profile => show_profile(ctx),
    }
}

fn handle_register(ctx: &Context, rest: &[&str]) {
    if rest.len() < 3 {
        println!("Usage: register <user> <password> <email> [YYYY-MM-DD]");
        return;
    }
    let (dialog, handle) = ctx.app.welcome.open_registration();
    dialog.set_form(RegistrationForm {
        username: rest[0].to_string(),
        password: rest[1].to_string(),
        email: rest[2].to_string(),
        birthday: rest.get(3).map(|s| s.to_string()).unwrap_or_default(),
    });
    if let SubmitOutcome::Invalid(errors) = dialog.submit() {
        for error in errors {
            println!("  {}", error);
        }
    }
    // A terminal dialog lasts one submission
    dialog.close();
    if handle.wait().is_some() {
        println!("Next: login {} <password>", rest[0]);
    }
}

fn handle_login(ctx: &Context, rest: &[&str]) {
    if rest.len() < 2 {
        println!("Usage: login <user> <password>");
        return;
    }
    let (dialog, handle) = ctx.app.welcome.open_login();
    dialog.set_form(LoginForm {
        username: rest[0].to_string(),
        password: rest[1].to_string(),
    });
    dialog.submit();
    dialog.close();
    if let Some(route) = ctx.app.welcome.after_login(handle.wait(), &ctx.app.router) {
        show_route(ctx, route);
    }
}

fn movie_line(catalog: &Catalog, movie: &Movie) -> String {
    let marker = if catalog.is_busy(movie) {
        "[…]"
    } else if catalog.is_favorited(movie) {
        "[♥]"
    } else {
        "[ ]"
    };
    let mut line = format!("{} {}", marker, movie.display_title());
    if !movie.genres.is_empty() {
        line.push_str(&format!(" ({})", movie.genres.join(", ")));
    }
    if let Some(director) = &movie.director {
        line.push_str(&format!(" - {}", director));
    }
    line
}

fn show_movies(ctx: &Context) {
    let catalog = &ctx.app.catalog;
    let movies = catalog.movies();
    if movies.is_empty() {
        println!("No movies to show.");
        return;
    }
    for (i, movie) in movies.iter().enumerate() {
        println!("{:>3}. {}", i + 1, movie_line(catalog, movie));
    }
}

fn handle_movie_action(ctx: &Context, command: &str, full_key: &str, first_key: &str) {
    let catalog = &ctx.app.catalog;
    let Some(movie) = catalog.find(full_key).or_else(|| catalog.find(first_key)) else {
        println!("No movie matches '{}'. Run movies to load the catalog.", full_key);
        return;
    };

    match command {
        "genre" => {
            let card = Catalog::genre_card(&movie);
            println!("{}", card.title);
            if card.genres.is_empty() {
                println!("  Genre: (none listed)");
            } else {
                println!("  Genre: {}", card.genres.join(", "));
            }
        }
        "director" => {
            let card = Catalog::director_card(&movie);
            println!("{}", card.title);
            println!(
                "  Director: {}",
                card.director.as_deref().unwrap_or("(unknown)")
            );
        }
        "details" => match serde_json::to_string_pretty(&movie.raw) {
            Ok(text) => println!("{}", text),
            Err(e) => println!("Could not render {}: {}", movie.display_title(), e),
        },
        _ => {
            catalog.toggle_favorite(&movie);
        }
    }
}

fn handle_lookup(ctx: &Context, rest: &[&str]) {
    let catalog = &ctx.app.catalog;
    let (Some(kind), Some(_)) = (rest.first(), rest.get(1)) else {
        println!("Usage: lookup movie|genre|director <name>");
        return;
    };
    let name = rest[1..].join(" ");
    match *kind {
        "movie" => {
            if let Some(movie) = catalog.lookup_movie(&name) {
                println!("{}", movie.display_title());
                if let Some(description) = &movie.description {
                    println!("  {}", description);
                }
                if !movie.genres.is_empty() {
                    println!("  Genre: {}", movie.genres.join(", "));
                }
                if let Some(director) = &movie.director {
                    println!("  Director: {}", director);
                }
            }
        }
        "genre" => {
            if let Some(genre) = catalog.lookup_genre(&name) {
                println!("{}", genre.name);
                if let Some(description) = genre.description {
                    println!("  {}", description);
                }
            }
        }
        "director" => {
            if let Some(director) = catalog.lookup_director(&name) {
                println!("{}", director.name);
                if let Some(bio) = director.bio {
                    println!("  {}", bio);
                }
                match (director.birth, director.death) {
                    (Some(birth), Some(death)) => println!("  {} - {}", birth, death),
                    (Some(birth), None) => println!("  Born {}", birth),
                    _ => {}
                }
            }
        }
        other => println!("Unknown lookup: {} (movie, genre or director)", other),
    }
}

fn favorite_line(entry: &MovieRef) -> String {
    match entry {
        MovieRef::Identifier(id) => id.to_string(),
        MovieRef::Reference { id, movie } => format!("{} ({})", movie.display_title(), id),
    }
}

fn show_profile(ctx: &Context) {
    let profile = &ctx.app.profile;
    let state = profile.snapshot();
    if state.form.username.is_empty() {
        return;
    }
    let form = &state.form;
    println!("Username: {}", form.username);
    println!("Email:    {}", form.email);
    println!(
        "Birthday: {}",
        if form.birthday.is_empty() {
            "(not set)"
        } else {
            &form.birthday
        }
    );
    if !form.password.is_empty() {
        println!("Password: (changed, not saved)");
    }
    if state.favorites.is_empty() {
        println!("No favorite movies yet.");
    } else {
        println!("Favorites:");
        for (i, entry) in state.favorites.iter().enumerate() {
            let marker = if profile.is_removing(entry.id()) { " …" } else { "" };
            println!("{:>3}. {}{}", i + 1, favorite_line(entry), marker);
        }
    }
}

fn handle_set(ctx: &Context, rest: &[&str]) {
    let (Some(field), Some(_)) = (rest.first(), rest.get(1)) else {
        println!("Usage: set email|birthday|password <value>");
        return;
    };
    let value = rest[1..].join(" ");
    match *field {
        "email" => ctx.app.profile.edit(|form| form.email = value),
        "birthday" => ctx.app.profile.edit(|form| form.birthday = value),
        "password" => ctx.app.profile.edit(|form| form.password = value),
        other => {
            println!("Unknown field: {} (email, birthday or password)", other);
            return;
        }
    }
    println!("Updated {}; run save to submit.", field);
}
