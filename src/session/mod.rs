use crate::domain::ports::SessionStore;
use crate::utils::error::Result;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Landing,
    Protected,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        match path {
            "/login" => Route::Login,
            "/" => Route::Landing,
            _ => Route::Protected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    ToLogin,
    ToDashboard,
}

/// 純函式的路由守門：沒登入不能進受保護頁，登入後不再進登入頁
pub fn guard(route: Route, logged_in: bool) -> Option<Redirect> {
    if !logged_in && route == Route::Protected {
        return Some(Redirect::ToLogin);
    }
    if logged_in && route == Route::Login {
        return Some(Redirect::ToDashboard);
    }
    None
}

/// 登入旗標存成一個檔案，檔案存在即視為已登入
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStore for FileSession {
    fn is_logged_in(&self) -> bool {
        self.path.exists()
    }

    fn log_in(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, chrono::Utc::now().to_rfc3339())?;
        Ok(())
    }

    fn log_out(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
