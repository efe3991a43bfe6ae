//! Builtin and standard-library classification.
//!
//! Two static name sets, built once on first use and shared read-only
//! across threads:
//!
//! - names always available in an annotation without an import
//!   (the `builtins` module, public `typing` constructs, the
//!   `collections.abc` protocols, and `ABC` / `ABCMeta` / `abstractmethod`)
//! - top-level module names shipped with the standard distribution
//!   (mirrors `sys.stdlib_module_names` for CPython 3.12)

use once_cell::sync::Lazy;
use std::collections::HashSet;

const BUILTIN_MODULE_NAMES: &[&str] = &[
    // Types and functions
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint",
    "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
    "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate", "eval",
    "exec", "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
    "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance", "issubclass",
    "iter", "len", "license", "list", "locals", "map", "max", "memoryview", "min",
    "next", "object", "oct", "open", "ord", "pow", "print", "property", "quit",
    "range", "repr", "reversed", "round", "set", "setattr", "slice", "sorted",
    "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
    // Constants
    "Ellipsis", "False", "None", "NotImplemented", "True",
    // Exception hierarchy
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
    "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError",
    "BytesWarning", "ChildProcessError", "ConnectionAbortedError", "ConnectionError",
    "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning", "EOFError",
    "EncodingWarning", "EnvironmentError", "Exception", "ExceptionGroup",
    "FileExistsError", "FileNotFoundError", "FloatingPointError", "FutureWarning",
    "GeneratorExit", "IOError", "ImportError", "ImportWarning", "IndentationError",
    "IndexError", "InterruptedError", "IsADirectoryError", "KeyError",
    "KeyboardInterrupt", "LookupError", "MemoryError", "ModuleNotFoundError",
    "NameError", "NotADirectoryError", "NotImplementedError", "OSError",
    "OverflowError", "PendingDeprecationWarning", "PermissionError",
    "ProcessLookupError", "RecursionError", "ReferenceError", "ResourceWarning",
    "RuntimeError", "RuntimeWarning", "StopAsyncIteration", "StopIteration",
    "SyntaxError", "SyntaxWarning", "SystemError", "SystemExit", "TabError",
    "TimeoutError", "TypeError", "UnboundLocalError", "UnicodeDecodeError",
    "UnicodeEncodeError", "UnicodeError", "UnicodeTranslateError", "UnicodeWarning",
    "UserWarning", "ValueError", "Warning", "ZeroDivisionError",
];

const TYPING_NAMES: &[&str] = &[
    "AbstractSet", "Annotated", "Any", "AnyStr", "AsyncContextManager",
    "AsyncGenerator", "AsyncIterable", "AsyncIterator", "Awaitable", "BinaryIO",
    "ByteString", "Callable", "ChainMap", "ClassVar", "Collection", "Concatenate",
    "Container", "ContextManager", "Coroutine", "Counter", "DefaultDict", "Deque",
    "Dict", "Final", "ForwardRef", "FrozenSet", "Generator", "Generic", "Hashable",
    "IO", "ItemsView", "Iterable", "Iterator", "KeysView", "List", "Literal",
    "LiteralString", "Mapping", "MappingView", "Match", "MutableMapping",
    "MutableSequence", "MutableSet", "NamedTuple", "Never", "NewType", "NoDefault",
    "NoReturn", "NotRequired", "Optional", "OrderedDict", "ParamSpec",
    "ParamSpecArgs", "ParamSpecKwargs", "Pattern", "Protocol", "ReadOnly",
    "Required", "Reversible", "Self", "Sequence", "Set", "Sized", "SupportsAbs",
    "SupportsBytes", "SupportsComplex", "SupportsFloat", "SupportsIndex",
    "SupportsInt", "SupportsRound", "TYPE_CHECKING", "Text", "TextIO", "Tuple",
    "Type", "TypeAlias", "TypeAliasType", "TypeGuard", "TypeIs", "TypeVar",
    "TypeVarTuple", "TypedDict", "Union", "Unpack", "ValuesView",
    "assert_never", "assert_type", "cast", "clear_overloads", "dataclass_transform",
    "final", "get_args", "get_origin", "get_overloads", "get_type_hints",
    "is_typeddict", "no_type_check", "no_type_check_decorator", "overload",
    "override", "reveal_type", "runtime_checkable",
];

const COLLECTIONS_ABC_NAMES: &[&str] = &[
    "AsyncGenerator", "AsyncIterable", "AsyncIterator", "Awaitable", "Buffer",
    "ByteString", "Callable", "Collection", "Container", "Coroutine", "Generator",
    "Hashable", "ItemsView", "Iterable", "Iterator", "KeysView", "Mapping",
    "MappingView", "MutableMapping", "MutableSequence", "MutableSet", "Reversible",
    "Sequence", "Set", "Sized", "ValuesView",
];

const ABC_NAMES: &[&str] = &["ABC", "ABCMeta", "abstractmethod"];

const STDLIB_MODULES: &[&str] = &[
    "__future__", "_abc", "_ast", "_asyncio", "_collections", "_collections_abc",
    "_io", "_thread", "_typing", "_warnings", "_weakref",
    "abc", "aifc", "antigravity", "argparse", "array", "ast", "asynchat", "asyncio",
    "asyncore", "atexit", "audioop", "base64", "bdb", "binascii", "bisect",
    "builtins", "bz2", "cProfile", "calendar", "cgi", "cgitb", "chunk", "cmath",
    "cmd", "code", "codecs", "codeop", "collections", "colorsys", "compileall",
    "concurrent", "configparser", "contextlib", "contextvars", "copy", "copyreg",
    "crypt", "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal",
    "difflib", "dis", "distutils", "doctest", "email", "encodings", "ensurepip",
    "enum", "errno", "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch",
    "fractions", "ftplib", "functools", "gc", "genericpath", "getopt", "getpass",
    "gettext", "glob", "graphlib", "grp", "gzip", "hashlib", "heapq", "hmac", "html",
    "http", "idlelib", "imaplib", "imghdr", "imp", "importlib", "inspect", "io",
    "ipaddress", "itertools", "json", "keyword", "lib2to3", "linecache", "locale",
    "logging", "lzma", "mailbox", "mailcap", "marshal", "math", "mimetypes", "mmap",
    "modulefinder", "msilib", "msvcrt", "multiprocessing", "netrc", "nis",
    "nntplib", "nt", "ntpath", "nturl2path", "numbers", "opcode", "operator",
    "optparse", "os", "ossaudiodev", "pathlib", "pdb", "pickle", "pickletools",
    "pipes", "pkgutil", "platform", "plistlib", "poplib", "posix", "posixpath",
    "pprint", "profile", "pstats", "pty", "pwd", "py_compile", "pyclbr", "pydoc",
    "pydoc_data", "pyexpat", "queue", "quopri", "random", "re", "readline",
    "reprlib", "resource", "rlcompleter", "runpy", "sched", "secrets", "select",
    "selectors", "shelve", "shlex", "shutil", "signal", "site", "smtpd", "smtplib",
    "sndhdr", "socket", "socketserver", "spwd", "sqlite3", "sre_compile",
    "sre_constants", "sre_parse", "ssl", "stat", "statistics", "string",
    "stringprep", "struct", "subprocess", "sunau", "symtable", "sys", "sysconfig",
    "syslog", "tabnanny", "tarfile", "telnetlib", "tempfile", "termios", "textwrap",
    "this", "threading", "time", "timeit", "tkinter", "token", "tokenize", "tomllib",
    "trace", "traceback", "tracemalloc", "tty", "turtle", "turtledemo", "types",
    "typing", "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib",
    "xml", "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
];

static BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    BUILTIN_MODULE_NAMES
        .iter()
        .chain(TYPING_NAMES)
        .chain(COLLECTIONS_ABC_NAMES)
        .chain(ABC_NAMES)
        .copied()
        .collect()
});

static STDLIB: Lazy<HashSet<&'static str>> = Lazy::new(|| STDLIB_MODULES.iter().copied().collect());

/// Strips generic arguments: `List[str]` -> `List`.
pub fn strip_generics(name: &str) -> &str {
    name.split('[').next().unwrap_or(name).trim()
}

/// True if `name` is available in annotations without an import.
///
/// Dotted names are never builtin; `typing.List` still requires an import.
pub fn is_builtin(name: &str) -> bool {
    let base = strip_generics(name);
    if base.contains('.') {
        return false;
    }
    BUILTINS.contains(base)
}

/// True if the package (checked on its root segment) ships with the standard distribution.
pub fn is_stdlib_package(name: &str) -> bool {
    let root = name.split('.').next().unwrap_or(name);
    STDLIB.contains(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert!(is_builtin("str"));
        assert!(is_builtin("Optional"));
        assert!(is_builtin("Dict"));
        assert!(is_builtin("ValueError"));
        assert!(is_builtin("ABC"));
        assert!(is_builtin("Awaitable"));
        assert!(!is_builtin("Widget"));
    }

    #[test]
    fn test_generics_stripped() {
        assert!(is_builtin("List[str]"));
        assert!(is_builtin("Dict[str, Widget]"));
        assert!(!is_builtin("Widget[int]"));
    }

    #[test]
    fn test_dotted_never_builtin() {
        assert!(!is_builtin("typing.List"));
        assert!(!is_builtin("builtins.str"));
        assert!(!is_builtin("os.PathLike"));
    }

    #[test]
    fn test_stdlib_by_root_segment() {
        assert!(is_stdlib_package("os"));
        assert!(is_stdlib_package("collections.abc"));
        assert!(is_stdlib_package("http.client"));
        assert!(!is_stdlib_package("requests"));
        assert!(!is_stdlib_package("azure.core"));
    }
}
