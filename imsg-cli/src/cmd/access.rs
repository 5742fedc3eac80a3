//! Authorization commands: status, request.

use imsg::AuthStatus;

/// Print the current authorization status.
pub fn status() -> imsg::Result<()> {
    let status = imsg::auth_status()?;
    println!("Contacts access: {status}");
    if status == AuthStatus::NotDetermined {
        println!("Run `imsg-contacts request` to ask for access.");
    }
    Ok(())
}

/// Ask for access and print the outcome.
pub fn request() -> imsg::Result<()> {
    let status = imsg::request_access()?;
    println!("Contacts access: {status}");
    Ok(())
}
