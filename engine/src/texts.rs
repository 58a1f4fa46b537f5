//! User-facing text
//!
//! Every string the bot sends lives here. Menu labels double as the
//! router's triggers, so they must match what the keyboards render.

// Menu labels
pub const BTN_ADD_MANAGER: &str = "➕ افزودن مدیر میانی";
pub const BTN_ADD_USER: &str = "➕ افزودن کاربر";
pub const BTN_CREATE_TASK: &str = "➕ تعریف تسک";
pub const BTN_VIEW_REPORTS: &str = "📥 مشاهده گزارش‌ها";
pub const BTN_ACTIVE_TASKS: &str = "🗂 مشاهده تسک‌های فعال";
pub const BTN_LIST_USERS: &str = "👥 لیست کاربران";
pub const BTN_MANAGER_REPORT: &str = "📝 ثبت گزارش برای مدیر";
pub const BTN_LIST_TEAM: &str = "👥 لیست اعضای تیم";
pub const BTN_SEND_REPORT: &str = "📝 ارسال گزارش";
pub const BTN_MY_REPORTS: &str = "📥 مشاهده گزارش‌های من";
pub const BTN_CANCEL: &str = "❌ کنسل";

// Greetings
pub const WELCOME_ADMIN: &str = "خوش اومدی مدیر اصلی 👑";
pub const WELCOME_MANAGER: &str = "خوش اومدی مدیر میانی 🌟";
pub const WELCOME_MEMBER: &str = "سلام! خوش اومدی. از منوی زیر استفاده کن:";

// General
pub const CANCELLED: &str = "عملیات لغو شد.";
pub const NOT_REGISTERED: &str = "ابتدا با دستور /start ثبت‌نام کن.";
pub const UNKNOWN_INPUT: &str = "دستور نامعتبر است. از منوی زیر استفاده کن:";
pub const FAILURE: &str = "خطایی رخ داد. لطفاً دوباره تلاش کنید.";

// Authorization
pub const ONLY_ADMIN: &str = "دسترسی فقط برای مدیر اصلی!";
pub const ONLY_MANAGER: &str = "این بخش فقط برای مدیرهای میانی است!";
pub const ONLY_MANAGERS: &str = "این بخش فقط برای مدیران است.";
pub const ONLY_MEMBERS: &str = "این بخش فقط برای اعضای تیم است.";

// Add manager / add user
pub const ASK_MANAGER_HANDLE: &str =
    "آیدی عددی یا یوزرنیم مدیر میانی را وارد کنید (مثلاً: @user یا 123456789):";
pub const ASK_MEMBER_HANDLE: &str =
    "آیدی عددی یا یوزرنیم کاربر را وارد کنید (مثلاً: @user یا 123456789):";
pub const BAD_HANDLE: &str = "فرمت آیدی/یوزرنیم اشتباه است.";
pub const HANDLE_NOT_ALLOWED: &str = "این کاربر را نمی‌توان با این نقش افزود.";
pub const ASK_MANAGER_NAME: &str = "نام کامل مدیر میانی را وارد کنید:";
pub const ASK_MEMBER_NAME: &str = "نام کامل کاربر را وارد کنید:";
pub const ASK_MANAGER_POSITION: &str = "سمت (مثلاً: مدیر فروش):";
pub const ASK_MEMBER_POSITION: &str = "سمت کاربر را وارد کنید (مثلاً: کارشناس پشتیبانی):";
pub const MANAGER_ADDED: &str = "✅ مدیر میانی با موفقیت افزوده شد.";
pub const MEMBER_ADDED: &str = "✅ کاربر با موفقیت افزوده شد.";

// Task creation
pub const ASK_TASK_TITLE: &str = "عنوان تسک را وارد کنید:";
pub const ASK_TASK_DESCRIPTION: &str = "توضیح تسک را وارد کنید (یا بنویسید ندارد):";
pub const ASK_DEADLINE: &str = "ددلاین را به شمسی وارد کنید (مثال: 26 خرداد 1404):";
pub const BAD_DEADLINE: &str = "فرمت ددلاین نادرست است. مثال درست: 26 خرداد 1404";
pub const ASK_REMINDER: &str = "چه بازه‌ای برای یادآوری تنظیم کنم؟\nنمونه:\n6 ساعت\nیا\n3 روز\nیا بنویسید: فقط روز ددلاین";
pub const BAD_REMINDER_HOURS: &str = "عدد ساعت باید بین 1 تا 48 باشد.";
pub const BAD_REMINDER_DAYS: &str = "عدد روز باید بین 1 تا 30 باشد.";
pub const ASK_ASSIGNEE_MANAGER: &str = "کدام مدیر میانی دریافت‌کننده تسک باشد؟";
pub const ASK_ASSIGNEE_MEMBER: &str = "کدام عضو تیم دریافت‌کننده تسک باشد؟";
pub const NO_MANAGERS: &str = "مدیر میانی ثبت نشده است.";
pub const NO_TEAM_FOR_TASK: &str = "هیچ عضوی برای تیم شما ثبت نشده.";
pub const BAD_ASSIGNEE: &str = "خطا در انتخاب دریافت‌کننده.";
pub const STALE_BUTTON: &str = "این دکمه دیگر معتبر نیست.";
pub const TASK_CREATED: &str = "✅ تسک با موفقیت ثبت شد.";

// Reports
pub const ASK_REPORT: &str = "لطفاً متن گزارش خود را ارسال کنید:";
pub const ASK_MANAGER_REPORT: &str = "متن گزارش برای مدیر اصلی را وارد کنید:";
pub const REPORT_SAVED: &str = "✅ گزارش شما با موفقیت ثبت شد.";
pub const MANAGER_REPORT_SAVED: &str = "✅ گزارش برای مدیر اصلی ثبت شد.";
/// Prefix that marks a manager's report to the admin
pub const MANAGER_REPORT_MARKER: &str = "[گزارش مدیر میانی]\n";

// Scoring
pub const SCORE_USAGE: &str = "فرمت صحیح:\n/score <report_id>";
pub const REPORT_NOT_FOUND: &str = "گزارشی با این شناسه پیدا نشد.";
pub const SCORE_NOT_ALLOWED: &str = "شما اجازه امتیاز دادن به این گزارش را ندارید.";
pub const ASK_SCORE: &str = "لطفاً امتیاز را وارد کنید (۱ تا ۵):";
pub const BAD_SCORE: &str = "فقط یک عدد بین ۱ تا ۵ وارد کنید.";
pub const SCORE_SAVED: &str = "✅ امتیاز ثبت شد.";

// Views
pub const NO_ACTIVE_TASKS: &str = "شما هیچ تسک فعالی ندارید.";
pub const TASKS_HEADER: &str = "📋 تسک‌های شما:\n\n";
pub const NO_REPORTS: &str = "هیچ گزارشی برای نمایش وجود ندارد.";
pub const REPORTS_HEADER: &str = "📊 لیست گزارش‌ها:\n\n";
pub const REPORTS_FOOTER: &str = "برای امتیاز دادن، دستور زیر را وارد کنید:\n/score <report_id>";
pub const NO_OWN_REPORTS: &str = "گزارشی برای شما ثبت نشده است.";
pub const OWN_REPORTS_HEADER: &str = "📥 گزارش‌های ثبت‌شده شما:\n\n";
pub const USERS_HEADER: &str = "👥 لیست مدیرهای میانی و اعضای تیم‌ها:\n";
pub const NO_USERS: &str = "هنوز مدیر میانی یا عضوی ثبت نشده است.";
pub const NO_TEAM: &str = "تیمی ثبت نشده است.";
pub const TEAM_HEADER: &str = "👥 لیست اعضای تیم:\n";
pub const NO_SCORE: &str = "ندارد";
