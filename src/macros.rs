macro_rules! verbose_println {
    ($($p:expr),+) => {
        if (crate::config::ARGS.verbose) {
            println!($($p),+);
        }
    }
}
macro_rules! info {
    ($($p:expr),+) => {
        println!(concat!(blue!("INFO"),": {}"),format_args!($($p),+))
    }
}

macro_rules! warn {
    ($($p:expr),+) => {
        eprintln!(concat!(red!("WARNING"),": {}"),format_args!($($p),+))
    }
}
macro_rules! general_err {
    ($msg:expr) => {
        crate::Error::new(crate::ErrorKind::General, None, format!("{}", $msg).as_str())
    };
}
macro_rules! recognition_err {
    ($line:expr, $($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Recognition,
            $line,
            format!("{} {}", red!("Recognition Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! table_err {
    ($line:expr, $($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Table,
            $line,
            format!("{} {}", red!("Table Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! consistency_err {
    ($($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Consistency,
            None,
            format!("{} {}", red!("Consistency Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! exception_err {
    ($($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Exception,
            None,
            format!("{} {}", red!("Exception Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! emit_err {
    ($($msg:expr),+) => {
        crate::Error::new(crate::ErrorKind::Emit, None, format!($($msg),+).as_str())
    };
}
macro_rules! color {
    ($color: literal, $msg: expr) => {
        concat!("\x1b[", $color, "m", $msg, "\x1b[0m")
    };
}
macro_rules! red {
    ($msg:expr) => {
        color!(91, $msg)
    };
}
macro_rules! green {
    ($msg:expr) => {
        color!(92, $msg)
    };
}
macro_rules! blue {
    ($msg:expr) => {
        color!(94, $msg)
    };
}
